use edge_sidecar::config::Settings;
use edge_sidecar::error::SidecarError;
use edge_sidecar::scheduler::{IdleReason, Mode, Scheduler};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn settings(root: &Path, node: &str, table: &str) -> Settings {
    let scripts_dir = root.join("scripts");
    fs::create_dir_all(&scripts_dir).unwrap();
    let nodes_conf = scripts_dir.join("nodes.conf");
    fs::write(&nodes_conf, table).unwrap();

    Settings {
        node_name: node.to_string(),
        nodes_conf,
        scripts_dir,
        textfile: root.join("textfile").join("custom_metrics.prom"),
        interpreter: PathBuf::from("/bin/sh"),
        ..Settings::default()
    }
}

#[test]
fn test_error_types() {
    let err = SidecarError::ProbeNotFound {
        role: "sensors".to_string(),
        path: PathBuf::from("/scripts/sensors.sh"),
    };

    assert!(err.to_string().contains("sensors"));
    assert!(err.to_string().contains("/scripts/sensors.sh"));
}

#[test]
fn test_version_const() {
    assert!(!edge_sidecar::VERSION.is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_end_to_end_publish() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path(), "edgeA", "# roles\nedgeA=sensors:200ms\nedgeB=gateway\n");
    fs::write(settings.scripts_dir.join("sensors.sh"), "echo battery=3.7\n").unwrap();

    let scheduler = Scheduler::resolve(&settings);
    assert_eq!(scheduler.assignment().role, "sensors");
    assert_eq!(scheduler.assignment().interval, Duration::from_millis(200));
    assert_eq!(scheduler.mode(), Mode::Active);

    let stats = scheduler
        .run_until(tokio::time::sleep(Duration::from_millis(900)))
        .await;
    assert!(stats.cycles >= 1);

    let text = fs::read_to_string(&settings.textfile).unwrap();
    assert!(text.contains("# TYPE edge_battery gauge"));
    assert!(text.contains("edge_battery{node=\"edgeA\"} 3.7"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_unlisted_node_stays_idle() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        heartbeat: Duration::from_millis(50),
        ..settings(dir.path(), "edgeZ", "edgeA=sensors:200ms\n")
    };
    fs::write(settings.scripts_dir.join("sensors.sh"), "echo battery=3.7\n").unwrap();

    let scheduler = Scheduler::resolve(&settings);
    assert_eq!(scheduler.mode(), Mode::Idle(IdleReason::DefaultRole));

    let stats = scheduler
        .run_until(tokio::time::sleep(Duration::from_millis(300)))
        .await;
    assert_eq!(stats.cycles, 0);
    assert!(stats.heartbeats >= 1);
    assert!(!settings.textfile.exists());
}

#[cfg(unix)]
#[tokio::test]
async fn test_role_without_probe_stays_idle() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path(), "edgeB", "edgeB=gateway:1s\n");

    let scheduler = Scheduler::resolve(&settings);
    assert_eq!(scheduler.mode(), Mode::Idle(IdleReason::MissingProbe));
}

#[cfg(unix)]
#[tokio::test]
async fn test_missing_role_table_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        nodes_conf: dir.path().join("absent.conf"),
        ..settings(dir.path(), "edgeA", "")
    };

    let scheduler = Scheduler::resolve(&settings);
    assert!(scheduler.assignment().is_default_role());
    assert_eq!(scheduler.assignment().interval, Duration::from_secs(15));
}
