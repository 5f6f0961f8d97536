//! Integration tests for Packyard

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn packyard() -> Command {
        cargo_bin_cmd!("packyard")
    }

    fn write_config(dir: &Path, content: &str) -> String {
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path.display().to_string()
    }

    #[test]
    fn help_displays() {
        packyard()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("builds on demand"));
    }

    #[test]
    fn version_displays() {
        packyard()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("packyard"));
    }

    #[test]
    fn config_path() {
        packyard()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_path_follows_flag() {
        packyard()
            .args(["--config", "/tmp/packyard-test/custom.toml", "config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("custom.toml"));
    }

    #[test]
    fn config_show() {
        packyard()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[upstream]"))
            .stdout(predicate::str::contains("newest-semver-tag"));
    }

    #[test]
    fn config_show_reads_file() {
        let dir = TempDir::new().unwrap();
        let config = write_config(
            dir.path(),
            "[resolve]\nlatest = \"head-revision\"\n\n[sandbox]\nruntime = \"docker\"\n",
        );

        packyard()
            .args(["--config", &config, "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("head-revision"))
            .stdout(predicate::str::contains("docker"));
    }

    #[test]
    fn invalid_config_is_reported() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path(), "[resolve]\nlatest = \"newest\"\n");

        packyard()
            .args(["--config", &config, "config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn unsupported_repository_shows_hint() {
        let dir = TempDir::new().unwrap();
        let config = write_config(
            dir.path(),
            &format!(
                "[upstream]\nrepository = \"https://gitlab.com/o/r\"\n\n[cache]\nstore_dir = \"{}\"\n",
                dir.path().join("store").display()
            ),
        );

        packyard()
            .args(["--config", &config, "tags"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unsupported repository URL"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn fetch_rejects_empty_package_name() {
        packyard()
            .args(["fetch", "@v1.2.0"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid package"));
    }

    #[test]
    fn serve_help() {
        packyard()
            .args(["serve", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--ephemeral"));
    }

    #[test]
    fn packages_help() {
        packyard()
            .args(["packages", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[VERSION]"));
    }

    #[test]
    fn packages_version_flag_shows_version() {
        packyard()
            .args(["packages", "--version"])
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn fetch_help() {
        packyard()
            .args(["fetch", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("defaults to stdout"));
    }
}
