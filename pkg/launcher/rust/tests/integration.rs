// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

mod helpers;

use helpers::{Launcher, write_config, write_script};
use std::fs;

// ===========================================================================
// Group 1: Launch sequence
// ===========================================================================

#[test]
fn test_prepare_install_and_relay() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("a.ts"), "X").unwrap();
    fs::write(root.join("p.json"), "{}").unwrap();
    let config = write_config(
        root,
        "seq",
        r#"
prepare:
  - source: a.ts
    destination: dest/a.ts
  - source: p.json
    destination: dest/p.json
install:
  command: /bin/sh
  args: ["-c", "test -f a.ts && test -f p.json"]
  working_dir: dest
command: /bin/sh
args: ["-c", "printf 'ready\n'"]
"#,
    );

    let out = Launcher::new(root)
        .arg("run")
        .arg(config.to_str().unwrap())
        .output();

    assert_eq!(out.code, Some(0));
    assert_eq!(out.stdout, b"ready\n", "stdout must carry only child output");
    assert_eq!(fs::read(root.join("dest/a.ts")).unwrap(), b"X");
    assert_eq!(fs::read(root.join("dest/p.json")).unwrap(), b"{}");
    assert!(out.stderr.contains("[seq] spawned (pid="));
}

#[test]
fn test_stderr_relayed_to_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "noisy",
        "command: /bin/sh\nargs: [\"-c\", \"echo oops >&2\"]\n",
    );

    let out = Launcher::new(dir.path())
        .arg("run")
        .arg(config.to_str().unwrap())
        .output();

    assert_eq!(out.code, Some(0));
    assert!(out.stdout.is_empty());
    assert!(out.stderr.contains("oops\n"));
}

#[test]
fn test_install_failure_stops_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "seq",
        r#"
install:
  command: /bin/sh
  args: ["-c", "echo 'npm ERR! broken' >&2; exit 1"]
command: /bin/sh
args: ["-c", "touch launched"]
"#,
    );

    let out = Launcher::new(dir.path())
        .arg("run")
        .arg(config.to_str().unwrap())
        .output();

    assert_eq!(out.code, Some(1));
    assert!(!dir.path().join("launched").exists());
    assert!(out.stderr.contains("npm ERR! broken"));
}

#[test]
fn test_missing_source_stops_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "seq",
        r#"
prepare:
  - source: missing.ts
    destination: dest/missing.ts
command: /bin/sh
args: ["-c", "touch launched"]
"#,
    );

    let out = Launcher::new(dir.path())
        .arg("run")
        .arg(config.to_str().unwrap())
        .output();

    assert_eq!(out.code, Some(1));
    assert!(!dir.path().join("launched").exists());
    assert!(!dir.path().join("dest").exists());
    assert!(out.stderr.contains("missing.ts"));
}

#[test]
fn test_spawn_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "bad", "command: /nonexistent/binary\n");

    let out = Launcher::new(dir.path())
        .arg("run")
        .arg(config.to_str().unwrap())
        .output();

    assert_eq!(out.code, Some(1));
    assert!(out.stderr.contains("failed to spawn /nonexistent/binary"));
}

// ===========================================================================
// Group 2: Exit code policy
// ===========================================================================

#[test]
fn test_child_exit_code_propagated() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "fail", "command: /bin/sh\nargs: [\"-c\", \"exit 3\"]\n");

    let out = Launcher::new(dir.path())
        .arg("run")
        .arg(config.to_str().unwrap())
        .output();
    assert_eq!(out.code, Some(3));
}

#[test]
fn test_no_propagate_flag() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "fail", "command: /bin/sh\nargs: [\"-c\", \"exit 3\"]\n");

    let out = Launcher::new(dir.path())
        .arg("--no-propagate-exit-code")
        .arg("run")
        .arg(config.to_str().unwrap())
        .output();
    assert_eq!(out.code, Some(0));
}

#[test]
fn test_no_propagate_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "fail",
        "command: /bin/sh\nargs: [\"-c\", \"exit 3\"]\npropagate_exit_code: false\n",
    );

    let out = Launcher::new(dir.path())
        .arg("run")
        .arg(config.to_str().unwrap())
        .output();
    assert_eq!(out.code, Some(0));
}

#[test]
fn test_signaled_child_maps_to_128_plus_signal() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "killed",
        "command: /bin/sh\nargs: [\"-c\", \"kill -KILL $$\"]\n",
    );

    let out = Launcher::new(dir.path())
        .arg("run")
        .arg(config.to_str().unwrap())
        .output();
    assert_eq!(out.code, Some(137));
}

// ===========================================================================
// Group 3: Presets
// ===========================================================================

#[test]
fn test_cloudview_preset() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let bin = root.join("bin");
    fs::create_dir(&bin).unwrap();
    write_script(
        &bin,
        "npm",
        r#"if [ "$1" = install ]; then touch installed; exit 0; fi
echo "npm $*""#,
    );
    fs::write(root.join("awyes.ts"), "export default {};\n").unwrap();
    fs::write(root.join("package.json"), "{\"name\":\"client\"}").unwrap();
    let clients = root.join("pkg/cloudview/clients");
    fs::create_dir_all(&clients).unwrap();

    let out = Launcher::new(root)
        .with_path_prefix(&bin)
        .arg("cloudview")
        .arg("--package-dir")
        .arg("pkg")
        .output();

    assert_eq!(out.code, Some(0));
    assert_eq!(out.stdout_str(), "npm run dev --prefix pkg/cloudview\n");
    assert!(clients.join("installed").exists(), "install runs in clients dir");
    assert_eq!(
        fs::read_to_string(clients.join("awyes.ts")).unwrap(),
        "export default {};\n"
    );
    assert_eq!(
        fs::read_to_string(clients.join("package.json")).unwrap(),
        "{\"name\":\"client\"}"
    );
}

#[test]
fn test_deploy_preset_reports_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("bin");
    fs::create_dir(&bin).unwrap();
    write_script(&bin, "yarn", "echo \"running $1\"\necho warn >&2\nexit 2");

    let out = Launcher::new(dir.path())
        .with_path_prefix(&bin)
        .arg("deploy")
        .output();

    assert_eq!(out.code, Some(2));
    let stdout = out.stdout_str();
    assert_eq!(
        stdout,
        "stdout: running deploy\nchild process exited with code 2\n"
    );
    assert_eq!(
        stdout.lines().last().unwrap().matches('2').count(),
        1,
        "completion message should carry the code once"
    );
    assert!(out.stderr.contains("stderr: warn\n"));
}

// ===========================================================================
// Group 4: Config directory
// ===========================================================================

#[test]
fn test_run_by_name_from_env_config_dir() {
    let dir = tempfile::tempdir().unwrap();
    let configs = dir.path().join("launch.d");
    fs::create_dir(&configs).unwrap();
    write_config(
        &configs,
        "hello",
        "command: /bin/sh\nargs: [\"-c\", \"printf hello\"]\n",
    );

    let out = Launcher::new(dir.path())
        .env("AWYES_LAUNCHER_CONFIG_DIR", configs.to_str().unwrap())
        .arg("run")
        .arg("hello")
        .output();

    assert_eq!(out.code, Some(0));
    assert_eq!(out.stdout, b"hello");
}

#[test]
fn test_run_unknown_name() {
    let dir = tempfile::tempdir().unwrap();
    let out = Launcher::new(dir.path())
        .arg("--config-dir")
        .arg(dir.path().to_str().unwrap())
        .arg("run")
        .arg("nothing")
        .output();

    assert_eq!(out.code, Some(1));
    assert!(out.stderr.contains("no launch config named \"nothing\""));
}

#[test]
fn test_list_configs() {
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "deploy", "description: Ship it\ncommand: yarn\n");
    write_config(dir.path(), "cloudview", "command: npm\n");
    write_config(dir.path(), "broken", "not: valid: yaml: [");

    let out = Launcher::new(dir.path())
        .arg("--config-dir")
        .arg(dir.path().to_str().unwrap())
        .arg("list")
        .output();

    assert_eq!(out.code, Some(0));
    assert_eq!(out.stdout_str(), "cloudview\ndeploy\tShip it\n");
    assert!(out.stderr.contains("skipping"));
}
