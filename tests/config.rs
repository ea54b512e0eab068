// Integration tests for loading machine configuration files

#[cfg(test)]
mod tests {
    use std::io::Write;

    use bluemarlin::config::{ConfigError, MoveRequest, load_config};
    use bluemarlin::motion::junction::JerkControl;
    use bluemarlin::motion::kinematics::KinematicsType;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn path(file: &NamedTempFile) -> String {
        file.path().to_string_lossy().into_owned()
    }

    #[test]
    fn test_load_sample_config() {
        let config = load_config(concat!(env!("CARGO_MANIFEST_DIR"), "/printer.toml")).unwrap();
        assert_eq!(config.printer.kinematics, KinematicsType::Cartesian);
        assert_eq!(config.job.moves.len(), 7);
        let parameter = config.parameter().unwrap();
        assert_eq!(parameter.axis_steps_per_unit, [80.0, 80.0, 400.0]);
        assert_eq!(parameter.extruder_steps_per_mm(0), 93.0);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let file = write_config(
            r#"
[printer]
printer_name = "test-delta"
kinematics = "delta"

[motion]
max_jerk = 12.5
jerk_control = "vector"

[delta]
diagonal_rod = 215.0

[[job.moves]]
x = 5.0
e = 0.25
"#,
        );
        let config = load_config(&path(&file)).unwrap();
        assert_eq!(config.printer.printer_name, "test-delta");
        assert_eq!(config.delta.diagonal_rod, 215.0);
        assert_eq!(config.delta.radius, 124.0);
        assert_eq!(
            config.job.moves,
            vec![MoveRequest { x: Some(5.0), e: 0.25, ..MoveRequest::default() }]
        );

        let parameter = config.parameter().unwrap();
        assert_eq!(parameter.max_jerk, 12.5);
        assert_eq!(parameter.jerk_control, JerkControl::Vector);
        assert_eq!(parameter.acceleration, 1000.0);

        let kinematics = config.kinematics();
        assert_eq!(kinematics.kinematics_type(), KinematicsType::Delta);
        assert!(!kinematics.is_linear());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let result = load_config(&missing.to_string_lossy());
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let file = write_config("[motion\nmax_jerk = 20.0\n");
        assert!(matches!(load_config(&path(&file)), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_unknown_kinematics_is_a_parse_error() {
        let file = write_config("[printer]\nkinematics = \"scara\"\n");
        assert!(matches!(load_config(&path(&file)), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let file = write_config("[motion]\nmax_feedrate = [300.0, 300.0, 0.0, 25.0]\n");
        assert!(matches!(load_config(&path(&file)), Err(ConfigError::Invalid(_))));

        let file = write_config("[printer]\nkinematics = \"delta\"\n\n[delta]\ndiagonal_rod = 100.0\nradius = 124.0\n");
        assert!(matches!(load_config(&path(&file)), Err(ConfigError::Invalid(_))));
    }
}
