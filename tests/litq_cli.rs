use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::{contains, is_empty};
use serde_json::{Value, json};
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn litq_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("litq"));
    cmd.env_remove("LITQ_PROVIDER")
        .env_remove("LITQ_MODEL")
        .env_remove("LITQ_SAMPLES")
        .env_remove("LITQ_MAX_TOKENS")
        .env_remove("LITQ_TIMEOUT")
        .env_remove("LITQ_CONFIG")
        .env_remove("RUST_LOG")
        .env_remove("OPENAI_API_KEY")
        .env_remove("AI21_API_KEY");
    cmd
}

fn unique_temp_path(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!("litq-test-{label}-{nanos}"))
}

fn parse_stdout_json(output: &[u8]) -> Value {
    let text = String::from_utf8(output.to_vec()).expect("stdout should be utf-8");
    serde_json::from_str(text.trim()).expect("stdout should contain valid JSON")
}

fn openai_choices(choices: &[(&str, &str)]) -> String {
    let choices: Vec<_> = choices
        .iter()
        .map(|(text, reason)| json!({ "text": text, "finish_reason": reason }))
        .collect();
    json!({ "choices": choices }).to_string()
}

#[test]
fn dry_run_succeeds_without_api_key() {
    let assert = litq_cmd()
        .args(["tag", "--dry-run", "Quarterly sales grew by 12%."])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["dry_run"], Value::Bool(true));
    assert_eq!(body["task"], json!("tag"));
    assert_eq!(body["provider"], json!("openai"));
    assert_eq!(body["model"], json!("code-davinci-002"));
    assert_eq!(body["url"], json!("https://api.openai.com/v1/completions"));
    assert_eq!(body["request"]["stop"], json!("]"));
    assert_eq!(body["request"]["n"], json!(10));
    assert!(
        body["prompt"]
            .as_str()
            .expect("prompt should be a string")
            .ends_with("assert tags == [")
    );
}

#[test]
fn missing_api_key_returns_explicit_error() {
    litq_cmd()
        .args(["tag", "hello"])
        .assert()
        .failure()
        .stderr(contains("OPENAI_API_KEY is not set in the environment"));
}

#[test]
fn invalid_provider_from_env_returns_error() {
    litq_cmd()
        .env("LITQ_PROVIDER", "bad")
        .args(["tag", "--dry-run", "hello"])
        .assert()
        .failure()
        .stderr(contains(
            "Invalid LITQ_PROVIDER 'bad'. Supported values: openai, ai21.",
        ));
}

#[test]
fn argument_text_has_priority_over_stdin() {
    let assert = litq_cmd()
        .args(["classify", "--class", "spam", "--dry-run", "argument text"])
        .write_stdin("stdin text")
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    let prompt = body["prompt"].as_str().expect("prompt should be a string");
    assert!(prompt.contains(r#"text = """argument text""""#));
    assert!(prompt.ends_with("assert is_spam(text) =="));
    assert_eq!(body["request"]["stop"], json!(["\n", ";"]));
}

#[test]
fn stdin_is_used_when_no_text_is_given() {
    let assert = litq_cmd()
        .args(["tag", "--dry-run"])
        .write_stdin("piped text")
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    let prompt = body["prompt"].as_str().expect("prompt should be a string");
    assert!(prompt.contains("piped text"));
}

#[test]
fn reverse_dry_run_ends_inside_open_string() {
    let assert = litq_cmd()
        .args([
            "reverse",
            "--provider",
            "ai21",
            "--dry-run",
            "-f",
            "to_id",
            "-e",
            "User Id=userid",
            "orderdate",
        ])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["provider"], json!("ai21"));
    assert_eq!(
        body["url"],
        json!("https://api.ai21.com/studio/v1/j2-jumbo-instruct/complete")
    );
    assert_eq!(
        body["prompt"],
        json!("assert \"userid\" == to_id(\"User Id\")\nassert \"orderdate\" == to_id(\"")
    );
    assert_eq!(body["request"]["stopSequences"], json!(["\""]));
}

#[test]
fn malformed_example_returns_usage_error() {
    litq_cmd()
        .args(["extrapolate", "--dry-run", "-f", "to_id", "-e", "nope", "x"])
        .assert()
        .failure()
        .stderr(contains("Invalid example 'nope'. Expected INPUT=OUTPUT."));
}

#[test]
fn most_common_with_several_classes_is_rejected() {
    litq_cmd()
        .env("OPENAI_API_KEY", "sk-test")
        .args(["classify", "-c", "spam", "-c", "urgent", "--most-common", "hi"])
        .assert()
        .failure()
        .stderr(contains("--most-common is only supported with a single --class"));
}

#[test]
fn limit_requires_most_common() {
    litq_cmd()
        .args(["tag", "--dry-run", "--limit", "3", "hello"])
        .assert()
        .failure()
        .stderr(contains("--most-common"));
}

#[test]
fn precedence_is_cli_then_env_then_profile() {
    let config_path = unique_temp_path("precedence");
    fs::write(
        &config_path,
        "[profiles.j2]\nprovider = \"ai21\"\nmodel = \"j2-ultra\"\nsamples = 4\nmax_tokens = 32\n",
    )
    .expect("config should be writable");

    let profile_only = litq_cmd()
        .env("LITQ_CONFIG", &config_path)
        .args(["tag", "--profile", "j2", "--dry-run", "hello"])
        .assert()
        .success();
    let body = parse_stdout_json(&profile_only.get_output().stdout);
    assert_eq!(body["provider"], json!("ai21"));
    assert_eq!(body["model"], json!("j2-ultra"));
    assert_eq!(body["request"]["numResults"], json!(4));
    assert_eq!(body["request"]["maxTokens"], json!(32));

    let env_over_profile = litq_cmd()
        .env("LITQ_CONFIG", &config_path)
        .env("LITQ_SAMPLES", "6")
        .args(["tag", "--profile", "j2", "--dry-run", "hello"])
        .assert()
        .success();
    let body = parse_stdout_json(&env_over_profile.get_output().stdout);
    assert_eq!(body["request"]["numResults"], json!(6));

    let cli_over_env = litq_cmd()
        .env("LITQ_CONFIG", &config_path)
        .env("LITQ_SAMPLES", "6")
        .args(["tag", "--profile", "j2", "--samples", "2", "--dry-run", "hello"])
        .assert()
        .success();
    let body = parse_stdout_json(&cli_over_env.get_output().stdout);
    assert_eq!(body["request"]["numResults"], json!(2));

    let _ = fs::remove_file(&config_path);
}

#[test]
fn profile_is_not_implicit_when_not_passed() {
    let config_path = unique_temp_path("no-implicit");
    fs::write(&config_path, "[profiles.default]\nprovider = \"ai21\"\n")
        .expect("config should be writable");

    let assert = litq_cmd()
        .env("LITQ_CONFIG", &config_path)
        .args(["tag", "--dry-run", "hello"])
        .assert()
        .success();
    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["provider"], json!("openai"));

    let _ = fs::remove_file(&config_path);
}

#[test]
fn tag_queries_provider_and_prints_samples() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("POST", "/v1/completions")
        .match_header("authorization", "Bearer sk-test")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(openai_choices(&[
            (r#""growth","sales""#, "stop"),
            (r#""growth""#, "stop"),
            (r#""cut""#, "length"),
        ]))
        .create();

    litq_cmd()
        .env("OPENAI_API_KEY", "sk-test")
        .args(["tag", "--base-url", &server.url(), "-n", "3", "sales grew"])
        .assert()
        .success()
        .stdout(contains("== TAG ==").and(contains(r#"["growth","sales"]"#)))
        .stdout(contains("cut").not());
}

#[test]
fn most_common_json_output_lists_counts() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("POST", "/v1/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(openai_choices(&[
            (r#""growth","sales""#, "stop"),
            (r#""growth""#, "stop"),
        ]))
        .create();

    let assert = litq_cmd()
        .env("OPENAI_API_KEY", "sk-test")
        .args([
            "tag",
            "--base-url",
            &server.url(),
            "--most-common",
            "--json",
            "sales grew",
        ])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["task"], json!("tag"));
    assert_eq!(body["most_common"], json!(true));
    assert_eq!(body["results"], json!([["growth", 2], ["sales", 1]]));
}

#[test]
fn most_common_text_output_is_tab_separated() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("POST", "/v1/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(openai_choices(&[(" True", "stop"), (" True", "stop"), (" False", "stop")]))
        .create();

    litq_cmd()
        .env("OPENAI_API_KEY", "sk-test")
        .args([
            "classify",
            "--base-url",
            &server.url(),
            "-c",
            "spam",
            "--most-common",
            "Win a free cruise!",
        ])
        .assert()
        .success()
        .stdout(contains("true\t2").and(contains("false\t1")));
}

#[test]
fn multi_class_answers_keep_class_order() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("POST", "/v1/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(openai_choices(&[("True, False", "stop")]))
        .create();

    litq_cmd()
        .env("OPENAI_API_KEY", "sk-test")
        .args([
            "classify",
            "--base-url",
            &server.url(),
            "-c",
            "urgent",
            "-c",
            "spam",
            "Reply today!",
        ])
        .assert()
        .success()
        .stdout(contains(r#"{"urgent":true,"spam":false}"#));
}

#[test]
fn api_error_is_reported_with_status() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("POST", "/v1/completions")
        .with_status(401)
        .with_body("invalid key")
        .create();

    litq_cmd()
        .env("OPENAI_API_KEY", "sk-test")
        .args(["tag", "--base-url", &server.url(), "hello"])
        .assert()
        .failure()
        .stderr(contains("401").and(contains("invalid key")));
}

#[test]
fn verbose_does_not_leak_api_key() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("POST", "/v1/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(openai_choices(&[(r#""growth""#, "stop")]))
        .create();

    litq_cmd()
        .env("OPENAI_API_KEY", "sk-very-secret")
        .args(["tag", "--verbose", "--base-url", &server.url(), "hello"])
        .assert()
        .success()
        .stderr(contains("api_key_present=true").and(contains("sk-very-secret").not()));
}

#[test]
fn quiet_suppresses_logging() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("POST", "/v1/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(openai_choices(&[(r#""growth""#, "stop")]))
        .create();

    litq_cmd()
        .env("OPENAI_API_KEY", "sk-test")
        .env("RUST_LOG", "debug")
        .args(["tag", "--quiet", "--base-url", &server.url(), "hello"])
        .assert()
        .success()
        .stderr(is_empty());
}

#[test]
fn profile_file_missing_returns_explicit_error() {
    let config_path = unique_temp_path("missing-config");
    litq_cmd()
        .env("LITQ_CONFIG", &config_path)
        .args(["tag", "--profile", "j2", "--dry-run", "hello"])
        .assert()
        .failure()
        .stderr(contains("Failed to read config file"));
}

#[test]
fn invalid_profile_toml_returns_parse_error() {
    let config_path = unique_temp_path("invalid-toml");
    fs::write(&config_path, "[profiles.bad\nprovider = \"openai\"")
        .expect("config should be writable");

    litq_cmd()
        .env("LITQ_CONFIG", &config_path)
        .args(["config", "check"])
        .assert()
        .failure()
        .stderr(contains("Failed to parse config file"));

    let _ = fs::remove_file(&config_path);
}

#[test]
fn config_check_reports_missing_profile_and_bad_values() {
    let config_path = unique_temp_path("config-check");
    fs::write(
        &config_path,
        "[profiles.ok]\nprovider = \"openai\"\n\n[profiles.bad]\nprovider = \"unknown\"\n",
    )
    .expect("config should be writable");

    litq_cmd()
        .env("LITQ_CONFIG", &config_path)
        .args(["config", "check", "--profile", "ok"])
        .assert()
        .success()
        .stdout(contains("config OK:").and(contains("profile 'ok'")));

    litq_cmd()
        .env("LITQ_CONFIG", &config_path)
        .args(["config", "check", "--profile", "missing"])
        .assert()
        .failure()
        .stderr(contains("Profile 'missing' not found"));

    litq_cmd()
        .env("LITQ_CONFIG", &config_path)
        .args(["config", "check"])
        .assert()
        .failure()
        .stderr(contains("Invalid profile provider 'unknown'"));

    let _ = fs::remove_file(&config_path);
}

#[test]
fn completion_scripts_are_generated() {
    for shell in ["bash", "zsh", "fish"] {
        litq_cmd()
            .args(["completion", shell])
            .assert()
            .success()
            .stdout(contains("litq"));
    }
}

#[test]
fn version_includes_build_metadata() {
    litq_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains("commit:").and(contains("built:")));
}
