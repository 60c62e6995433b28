// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submission artifacts: the remote shell scripts and the job spec.

use rv_core::{GpuRequirement, Relval, Step, StepSpec};
use serde_json::{json, Map, Value};

/// Remote file name of the config generation script
pub const GENERATE_SCRIPT: &str = "config_generate.sh";

/// Remote file name of the config upload script
pub const UPLOAD_SCRIPT: &str = "config_upload.sh";

/// Longest request string the job manager accepts once it adds its own
/// prefix and suffix.
const MAX_REQUEST_STRING: usize = 72;

/// Campaign name: `<release>__<batch>` plus the timestamp when one is set.
pub fn campaign(relval: &Relval) -> String {
    if relval.campaign_timestamp > 0 {
        format!(
            "{}__{}-{}",
            relval.cmssw_release, relval.batch_name, relval.campaign_timestamp
        )
    } else {
        format!("{}__{}", relval.cmssw_release, relval.batch_name)
    }
}

pub fn primary_dataset(relval: &Relval) -> String {
    let name = if relval.workflow_name.is_empty() {
        relval.steps.first().map(|s| s.name.as_str()).unwrap_or("")
    } else {
        relval.workflow_name.as_str()
    };
    format!("RelVal{}", name)
}

/// `RV<release><workflow>__<label>`, trimmed of separators and cut to length.
pub fn request_string(relval: &Relval) -> String {
    let release = relval
        .steps
        .iter()
        .map(|s| relval.release_of(s))
        .find(|r| !r.is_empty())
        .unwrap_or(relval.cmssw_release.as_str());
    let mut request = format!("RV{}{}__{}", release, relval.workflow_name, relval.label)
        .trim_matches('_')
        .to_string();
    request.truncate(MAX_REQUEST_STRING);
    request
}

/// Consecutive steps sharing a release and architecture.
fn environments(relval: &Relval, steps: &[(usize, &Step)]) -> Vec<(String, String, Vec<usize>)> {
    let mut groups: Vec<(String, String, Vec<usize>)> = Vec::new();
    for (index, step) in steps {
        let release = relval.release_of(step).to_string();
        let arch = relval.arch_of(step).to_string();
        match groups.last_mut() {
            Some((r, a, members)) if *r == release && *a == arch => members.push(*index),
            _ => groups.push((release, arch, vec![*index])),
        }
    }
    groups
}

fn environment_setup(release: &str, arch: &str) -> Vec<String> {
    vec![
        format!("# {} {}", release, arch),
        format!("export SCRAM_ARCH={}", arch),
        "source /cvmfs/cms.cern.ch/cmsset_default.sh".to_string(),
        format!("if [ ! -r {0}/src ] ; then scram p CMSSW {0} ; fi", release),
        format!("cd {}/src && eval `scram runtime -sh` && cd ../..", release),
    ]
}

fn driver_steps(relval: &Relval) -> Vec<(usize, &Step)> {
    relval
        .steps
        .iter()
        .enumerate()
        .filter(|(_, step)| !step.is_input())
        .collect()
}

/// Script that writes one `step_<n>_cfg.py` per command-driven step.
pub fn generate_script(relval: &Relval) -> String {
    let mut lines = vec![
        "#!/bin/bash".to_string(),
        String::new(),
        format!("# Configs for {}", relval.id),
    ];
    let steps = driver_steps(relval);
    for (release, arch, members) in environments(relval, &steps) {
        lines.push(String::new());
        lines.extend(environment_setup(&release, &arch));
        for index in members {
            let step = &relval.steps[index];
            let StepSpec::CommandDriven(driver) = &step.spec else {
                continue;
            };
            let conditions = if step.resolved_conditions.is_empty() {
                &driver.conditions
            } else {
                &step.resolved_conditions
            };
            let mut command = format!("{} --conditions {}", driver.command, conditions);
            if !driver.datatiers.is_empty() {
                command.push_str(&format!(" --datatier {}", driver.datatiers.join(",")));
            }
            if let Some(config) = step.config_file_name(index) {
                command.push_str(&format!(" --python_filename {}.py", config));
            }
            command.push_str(" --no_exec || exit $?");
            lines.push(format!("# step {}: {}", index + 1, step.name));
            lines.push(command);
        }
    }
    lines.push(String::new());
    lines.join("\n")
}

/// Script that checks every config exists and uploads them with
/// `upload_command`, which prints one `DocID <config> <id>` line each.
pub fn upload_script(relval: &Relval, upload_command: &str) -> String {
    let mut lines = vec!["#!/bin/bash".to_string(), String::new()];
    let steps = driver_steps(relval);
    for (index, step) in &steps {
        if let Some(config) = step.config_file_name(*index) {
            lines.push(format!("if [ ! -s \"{}.py\" ]; then", config));
            lines.push(format!("  echo \"File {}.py is missing\" >&2", config));
            lines.push("  exit 1".to_string());
            lines.push("fi".to_string());
        }
    }
    for (release, arch, members) in environments(relval, &steps) {
        lines.push(String::new());
        lines.extend(environment_setup(&release, &arch));
        for index in members {
            if let Some(config) = relval.steps[index].config_file_name(index) {
                lines.push(format!(
                    "{} --file $(pwd)/{}.py --label {} || exit $?",
                    upload_command, config, config
                ));
            }
        }
    }
    lines.push(String::new());
    lines.join("\n")
}

fn gpu_fields(step: &Step, task: &mut Map<String, Value>) {
    let requires = match step.gpu.requires {
        GpuRequirement::Forbidden => "forbidden",
        GpuRequirement::Optional => "optional",
        GpuRequirement::Required => "required",
    };
    task.insert("RequiresGPU".into(), json!(requires));
    if step.gpu.requires != GpuRequirement::Forbidden {
        task.insert(
            "GPUParams".into(),
            json!({
                "GPUMemoryMB": step.gpu.gpu_memory.unwrap_or(0),
                "CUDACapabilities": step.gpu.cuda_capabilities,
                "CUDARuntime": step.gpu.cuda_runtime,
            }),
        );
    }
}

/// One task of the chain for the step at `index`.
fn task_spec(relval: &Relval, index: usize) -> Value {
    let step = &relval.steps[index];
    let mut task = Map::new();
    task.insert("TaskName".into(), json!(step.name));
    task.insert("ConfigCacheID".into(), json!(step.config_id));
    task.insert("GlobalTag".into(), json!(step.resolved_conditions));
    task.insert("CMSSWVersion".into(), json!(relval.release_of(step)));
    task.insert("ScramArch".into(), json!([relval.arch_of(step)]));
    task.insert("Memory".into(), json!(relval.memory_mb));
    task.insert("Multicore".into(), json!(relval.cpu_cores));
    gpu_fields(step, &mut task);

    let previous = index.checked_sub(1).map(|i| &relval.steps[i]);
    match previous.map(|p| &p.spec) {
        Some(StepSpec::InputDataset(input)) => {
            task.insert("InputDataset".into(), json!(input.dataset));
            if !input.lumisections.is_empty() {
                task.insert("LumiList".into(), json!(input.lumisections));
            } else if !input.runs.is_empty() {
                task.insert("RunWhitelist".into(), json!(input.runs));
            }
        }
        Some(StepSpec::CommandDriven(_)) => {
            if let Some(p) = previous {
                task.insert("InputTask".into(), json!(p.name));
            }
        }
        None => {}
    }
    if previous.is_none() {
        task.insert("Seeding".into(), json!("AutomaticSeeding"));
        task.insert("PrimaryDataset".into(), json!(primary_dataset(relval)));
        task.insert("SplittingAlgo".into(), json!("EventBased"));
    }
    Value::Object(task)
}

/// Task-chain job spec for the job manager.
pub fn job_spec(relval: &Relval) -> Value {
    let steps = driver_steps(relval);
    let first = steps.first().map(|(_, s)| *s);
    let mut spec = Map::new();
    spec.insert("RequestType".into(), json!("TaskChain"));
    spec.insert("SubRequestType".into(), json!("RelVal"));
    spec.insert("PrepID".into(), json!(relval.id));
    spec.insert("RequestString".into(), json!(request_string(relval)));
    spec.insert("Campaign".into(), json!(campaign(relval)));
    spec.insert(
        "CMSSWVersion".into(),
        json!(first
            .map(|s| relval.release_of(s))
            .unwrap_or(relval.cmssw_release.as_str())),
    );
    spec.insert(
        "ScramArch".into(),
        json!([first
            .map(|s| relval.arch_of(s))
            .unwrap_or(relval.scram_arch.as_str())]),
    );
    spec.insert(
        "GlobalTag".into(),
        json!(first.map(|s| s.resolved_conditions.as_str()).unwrap_or("")),
    );
    spec.insert("Memory".into(), json!(relval.memory_mb));
    spec.insert("Multicore".into(), json!(relval.cpu_cores));
    spec.insert("ProcessingVersion".into(), json!(1));
    spec.insert("TaskChain".into(), json!(steps.len()));
    for (n, (index, _)) in steps.iter().enumerate() {
        spec.insert(format!("Task{}", n + 1), task_spec(relval, *index));
    }
    Value::Object(spec)
}

#[cfg(test)]
#[path = "scripts_tests.rs"]
mod tests;
