//! Python 3 flavor: a compile and execute recipe structured like
//! [`super::java21`] but driven by `<python_bin> entrypoint.py --key=value`
//! invocations instead of Gradle tasks.

use super::decode_details;
use crate::error::{ScaffoldError, StepError};
use crate::recipe::{Recipe, Step, StepArguments};
use crate::scaffold::run_command;
use saturn_protocol::{CompileRequest, ExecuteRequest, TaskStatus};
use saturn_storage::archive::{get_archive, put_archive, ArchiveOutcome};
use std::sync::{Arc, Mutex};

const ENTRYPOINT: &str = "entrypoint.py";

pub fn recipes(python_bin: &str, on_saturn: bool) -> (Recipe, Recipe) {
    (compile_recipe(python_bin, on_saturn), execute_recipe(python_bin, on_saturn))
}

fn welcome_step() -> Step {
    Step::new("welcome", |_arg: &StepArguments| {
        Box::pin(async move {
            let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
            let revision = std::env::var("SATURN_REVISION").unwrap_or_else(|_| "dev".to_string());
            tracing::info!(hostname, revision, "Welcome to Saturn!");
            Ok(())
        })
    })
}

fn prepare_step(python_bin: String, on_saturn: bool) -> Step {
    Step::new("prepare", move |arg: &StepArguments| {
        let python_bin = python_bin.clone();
        Box::pin(async move {
            let build_dir = arg.root.join("build");
            if build_dir.exists() {
                tokio::fs::remove_dir_all(&build_dir).await.map_err(ScaffoldError::from)?;
            }
            let on_saturn_flag = format!("--on-saturn={on_saturn}");
            run_command(&python_bin, &[ENTRYPOINT, "update", &on_saturn_flag], &arg.root, &[], &arg.cancel)
                .await
                .map_err(StepError::from)?;
            Ok(())
        })
    })
}

fn download_source_step() -> Step {
    Step::new("download-source", |arg: &StepArguments| {
        Box::pin(async move {
            let req: CompileRequest = decode_details(&arg.details)?;
            let dest = arg.root.join("src");
            let outcome = get_archive(arg.storage.as_ref(), &req.submission.source.bucket, &req.submission.source.name, &dest)
                .await
                .map_err(ScaffoldError::from)?;
            if outcome == ArchiveOutcome::Rejected {
                return Err(arg.finish_with(TaskStatus::Completed, Some(serde_json::json!({"accepted": false}))));
            }
            Ok(())
        })
    })
}

fn verify_submission_step(python_bin: String, on_saturn: bool) -> Step {
    Step::new("verify-submission", move |arg: &StepArguments| {
        let python_bin = python_bin.clone();
        Box::pin(async move {
            let req: CompileRequest = decode_details(&arg.details)?;
            if req.submission.package.is_empty() {
                return Err(arg.finish_with(TaskStatus::Completed, Some(serde_json::json!({"accepted": false}))));
            }
            let team_flag = format!("--team={}", req.submission.team_name);
            let on_saturn_flag = format!("--on-saturn={on_saturn}");
            match run_command(&python_bin, &[ENTRYPOINT, "verify", &team_flag, &on_saturn_flag], &arg.root, &[], &arg.cancel).await {
                Ok(_) => Ok(()),
                Err(ScaffoldError::CommandFailed { .. }) => {
                    Err(arg.finish_with(TaskStatus::Completed, Some(serde_json::json!({"accepted": false}))))
                }
                Err(other) => Err(StepError::from(other)),
            }
        })
    })
}

fn upload_binary_step() -> Step {
    Step::new("upload-binary", |arg: &StepArguments| {
        Box::pin(async move {
            let req: CompileRequest = decode_details(&arg.details)?;
            let build_dir = arg.root.join("build");
            put_archive(arg.storage.as_ref(), &req.submission.binary.bucket, &req.submission.binary.name, &build_dir)
                .await
                .map_err(ScaffoldError::from)?;
            Ok(())
        })
    })
}

fn compile_succeeded_step() -> Step {
    Step::new("compile-succeeded", |arg: &StepArguments| {
        Box::pin(async move { Err(arg.finish_with(TaskStatus::Completed, Some(serde_json::json!({"accepted": true})))) })
    })
}

fn compile_recipe(python_bin: &str, on_saturn: bool) -> Recipe {
    Recipe::new(vec![
        welcome_step(),
        prepare_step(python_bin.to_string(), on_saturn),
        download_source_step(),
        verify_submission_step(python_bin.to_string(), on_saturn),
        upload_binary_step(),
        compile_succeeded_step(),
    ])
}

fn download_binaries_step() -> Step {
    Step::new("download-binaries", |arg: &StepArguments| {
        Box::pin(async move {
            let req: ExecuteRequest = decode_details(&arg.details)?;
            for (label, submission, subdir) in [("A", &req.a, "A"), ("B", &req.b, "B")] {
                let dest = arg.root.join("data").join(subdir);
                let outcome = get_archive(arg.storage.as_ref(), &submission.binary.bucket, &submission.binary.name, &dest)
                    .await
                    .map_err(ScaffoldError::from)?;
                if outcome == ArchiveOutcome::Rejected {
                    tracing::warn!(team = label, "binary archive rejected");
                    return Err(arg.finish_with(TaskStatus::Completed, Some(serde_json::json!({"accepted": false}))));
                }
            }
            Ok(())
        })
    })
}

fn run_match_step(python_bin: String, on_saturn: bool, match_output: Arc<Mutex<Option<String>>>) -> Step {
    Step::new("run-match", move |arg: &StepArguments| {
        let python_bin = python_bin.clone();
        let match_output = Arc::clone(&match_output);
        Box::pin(async move {
            let req: ExecuteRequest = decode_details(&arg.details)?;
            let maps = req.maps.join(",");
            let args: Vec<String> = vec![
                ENTRYPOINT.to_string(),
                "run".to_string(),
                format!("--on-saturn={on_saturn}"),
                format!("--team-a={}", req.a.team_name),
                format!("--team-b={}", req.b.team_name),
                "--class-location-a=data/A".to_string(),
                "--class-location-b=data/B".to_string(),
                format!("--package-name-a={}", req.a.package),
                format!("--package-name-b={}", req.b.package),
                format!("--maps={maps}"),
                "--replay=data/replay.bin".to_string(),
                format!("--alternate-order={}", req.alternate_order),
                "--output-verbose=false".to_string(),
                "--show-indicators=false".to_string(),
            ];
            let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
            let output = run_command(&python_bin, &arg_refs, &arg.root, &[], &arg.cancel)
                .await
                .map_err(StepError::from)?;
            *match_output.lock().unwrap() = Some(output);
            Ok(())
        })
    })
}

fn upload_replay_step() -> Step {
    Step::new("upload-replay", |arg: &StepArguments| {
        Box::pin(async move {
            let req: ExecuteRequest = decode_details(&arg.details)?;
            let replay_path = arg.root.join("data").join("replay.bin");
            let data = tokio::fs::read(&replay_path).await.map_err(ScaffoldError::from)?;
            arg.storage
                .upload_file(&req.replay.bucket, &req.replay.name, data)
                .await
                .map_err(ScaffoldError::from)?;
            Ok(())
        })
    })
}

fn determine_scores_step(match_output: Arc<Mutex<Option<String>>>) -> Step {
    Step::new("determine-scores", move |arg: &StepArguments| {
        let match_output = Arc::clone(&match_output);
        Box::pin(async move {
            let output = match_output.lock().unwrap().take().unwrap_or_default();
            let scores = super::tally_scores(&output).map_err(StepError::from)?;
            Err(arg.finish_with(TaskStatus::Completed, Some(serde_json::json!({"scores": scores}))))
        })
    })
}

fn execute_recipe(python_bin: &str, on_saturn: bool) -> Recipe {
    let match_output: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    Recipe::new(vec![
        welcome_step(),
        prepare_step(python_bin.to_string(), on_saturn),
        download_binaries_step(),
        run_match_step(python_bin.to_string(), on_saturn, Arc::clone(&match_output)),
        upload_replay_step(),
        determine_scores_step(match_output),
    ])
}
