use crate::tools::{Bash, BashArgs, BashExecutor, Tool, ToolOutput};
use serde_json::json;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Runtime::new().unwrap()
}

#[test]
fn test_bash_tool_name() {
    assert_eq!(Bash::new().name(), "bash");
}

#[test]
fn test_bash_args_parsing() {
    let args: BashArgs = serde_json::from_value(json!({
        "command": "echo hello"
    }))
    .unwrap();

    assert_eq!(args.command, "echo hello");
    assert_eq!(args.timeout, 60);
    assert!(args.working_dir.is_none());
}

#[test]
fn test_bash_args_with_timeout() {
    let args: BashArgs = serde_json::from_value(json!({
        "command": "echo hello",
        "timeout": 30
    }))
    .unwrap();

    assert_eq!(args.timeout, 30);
}

#[test]
fn test_tool_output_into_outcome() {
    let ok = ToolOutput {
        stdout: "hello".to_string(),
        stderr: String::new(),
        exit_code: 0,
        duration_ms: 10,
    }
    .into_outcome();
    assert!(ok.success);
    assert_eq!(ok.data.unwrap()["stdout"], "hello");

    let failed = ToolOutput {
        stdout: String::new(),
        stderr: "bad".to_string(),
        exit_code: 2,
        duration_ms: 10,
    }
    .into_outcome();
    assert!(!failed.success);
    assert!(failed.error.unwrap().contains('2'));
    assert_eq!(failed.data.unwrap()["stderr"], "bad");
}

#[cfg(unix)]
#[test]
fn test_bash_executes_command() {
    let rt = runtime();
    rt.block_on(async {
        let outcome = Bash::new()
            .execute(json!({"command": "echo test"}))
            .await
            .unwrap();

        assert!(outcome.success);
        let data = outcome.data.unwrap();
        assert_eq!(data["exit_code"], 0);
        assert!(data["stdout"].as_str().unwrap().contains("test"));
    });
}

#[cfg(unix)]
#[test]
fn test_bash_nonzero_exit() {
    let rt = runtime();
    rt.block_on(async {
        let outcome = Bash::new()
            .execute(json!({"command": "exit 3"}))
            .await
            .unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.data.unwrap()["exit_code"], 3);
    });
}

#[cfg(unix)]
#[test]
fn test_bash_timeout() {
    let rt = runtime();
    rt.block_on(async {
        let args = BashArgs {
            command: "sleep 5".to_string(),
            timeout: 1,
            working_dir: None,
        };
        let err = BashExecutor::default().run(&args).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    });
}

#[cfg(unix)]
#[test]
fn test_bash_working_dir() {
    let rt = runtime();
    rt.block_on(async {
        let outcome = Bash::new()
            .with_working_dir("/tmp")
            .execute(json!({"command": "pwd"}))
            .await
            .unwrap();

        let stdout = outcome.data.unwrap()["stdout"].as_str().unwrap().to_string();
        assert!(stdout.trim().ends_with("tmp"));
    });
}
