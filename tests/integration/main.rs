//! Integration tests for turnip-builder

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn turnip_builder() -> Command {
        let mut cmd = cargo_bin_cmd!("turnip-builder");
        cmd.env_remove("TURNIP_BUILDER_CONFIG");
        cmd
    }

    #[test]
    fn help_displays() {
        turnip_builder()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Turnip driver builder"))
            .stdout(predicate::str::contains("check"));
    }

    #[test]
    fn version_displays() {
        turnip_builder()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("turnip-builder"));
    }

    #[test]
    fn config_path_prefers_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");

        turnip_builder()
            .args(["config", "path", "--config"])
            .arg(&path)
            .assert()
            .success()
            .stdout(predicate::str::contains("custom.toml"));
    }

    #[test]
    fn config_path_finds_local_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("turnip.toml"), "").unwrap();

        turnip_builder()
            .current_dir(dir.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("turnip.toml"));
    }

    #[test]
    fn config_show_merges_file_over_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("turnip.toml");
        std::fs::write(
            &path,
            "[build]\narch = \"arm\"\n\n[patches]\napply = [\"fix;merge_requests/1;\"]\n",
        )
        .unwrap();

        turnip_builder()
            .args(["config", "show", "-c"])
            .arg(&path)
            .assert()
            .success()
            .stdout(predicate::str::contains("arch = \"arm\""))
            .stdout(predicate::str::contains("fix;merge_requests/1;"))
            .stdout(predicate::str::contains("[toolchain]"));
    }

    #[test]
    fn invalid_config_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("turnip.toml");
        std::fs::write(&path, "[build]\narch = \"mips\"\n").unwrap();

        turnip_builder()
            .args(["config", "show", "-c"])
            .arg(&path)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn config_init_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        turnip_builder()
            .env("CI", "true")
            .args(["config", "init", "-c"])
            .arg(&path)
            .assert()
            .success();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("android-ndk-r28"));
    }

    #[test]
    fn check_fails_without_tools() {
        let empty = TempDir::new().unwrap();
        let config = TempDir::new().unwrap();
        let path = config.path().join("turnip.toml");
        std::fs::write(&path, "[dependencies]\nrequired = [\"meson\", \"patchelf\"]\n").unwrap();

        turnip_builder()
            .env("PATH", empty.path())
            .env("CI", "true")
            .args(["check", "-c"])
            .arg(&path)
            .assert()
            .code(1)
            .stdout(predicate::str::contains("meson not found"))
            .stderr(predicate::str::contains("Required tools not found: meson, patchelf"));
    }

    #[test]
    fn build_aborts_before_network_when_tools_missing() {
        let empty = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let config = TempDir::new().unwrap();
        let path = config.path().join("turnip.toml");
        std::fs::write(
            &path,
            "[dependencies]\nremediate = false\nrequired = [\"meson\"]\n",
        )
        .unwrap();

        turnip_builder()
            .env("PATH", empty.path())
            .env("CI", "true")
            .arg("-c")
            .arg(&path)
            .arg("-w")
            .arg(work.path().join("out"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Hint:"));

        assert!(!work.path().join("out").exists());
    }

    #[test]
    fn unknown_subcommand_fails() {
        turnip_builder().arg("deploy").assert().failure();
    }
}
