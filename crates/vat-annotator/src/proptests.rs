//! Property-based tests for vat-annotator

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::cli::{Cli, StartupError};
    use crate::config::{CliOverrides, Config};

    /// Strategy to generate valid log levels
    fn log_level_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("error".to_string()),
            Just("warn".to_string()),
            Just("info".to_string()),
            Just("debug".to_string()),
            Just("trace".to_string()),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// CLI port override takes precedence over the config file value
        #[test]
        fn test_config_override_port(config_port in 1u16.., cli_port in 1u16..) {
            let mut config = Config::default();
            config.session.port = config_port;

            let overrides = CliOverrides {
                port: Some(cli_port),
                ..Default::default()
            };
            let result = config.with_overrides(&overrides);

            prop_assert_eq!(result.session.port, cli_port);
            prop_assert!(result.validate().is_ok());
        }

        /// Without overrides, every file value survives
        #[test]
        fn test_config_preserved_without_override(
            level in log_level_strategy(),
            port in 1u16..,
            echo in any::<bool>(),
            wait_slice_ms in 1u64..=10_000,
        ) {
            let mut config = Config::default();
            config.logging.level = level.clone();
            config.session.port = port;
            config.pipeline.echo = echo;
            config.pipeline.wait_slice_ms = wait_slice_ms;

            let result = config.with_overrides(&CliOverrides::default());

            prop_assert_eq!(result.logging.level, level);
            prop_assert_eq!(result.session.port, port);
            prop_assert_eq!(result.pipeline.echo, echo);
            prop_assert_eq!(result.pipeline.wait_slice_ms, wait_slice_ms);
        }

        /// --debug wins over --verbose, which wins over the file level
        #[test]
        fn test_log_level_precedence(
            level in log_level_strategy(),
            verbose in any::<bool>(),
            debug in any::<bool>(),
        ) {
            let mut config = Config::default();
            config.logging.level = level.clone();

            let overrides = CliOverrides {
                verbose: verbose.then_some(true),
                debug: debug.then_some(true),
                ..Default::default()
            };
            let result = config.with_overrides(&overrides);

            let expected = if debug {
                "debug".to_string()
            } else if verbose {
                "info".to_string()
            } else {
                level
            };
            prop_assert_eq!(result.logging.level, expected);
        }

        /// Exactly the absent required options are reported, in a fixed order
        #[test]
        fn test_missing_options_reported(
            cid in proptest::option::of(any::<u16>()),
            name in proptest::option::of("[a-z]{1,12}"),
            width in proptest::option::of(1u32..4096),
            height in proptest::option::of(1u32..4096),
        ) {
            let cli = Cli {
                cid,
                name: name.clone(),
                width,
                height,
                ..Default::default()
            };

            let mut expected = Vec::new();
            if cid.is_none() { expected.push("cid"); }
            if name.is_none() { expected.push("name"); }
            if width.is_none() { expected.push("width"); }
            if height.is_none() { expected.push("height"); }

            match cli.required() {
                Ok(settings) => {
                    prop_assert!(expected.is_empty());
                    prop_assert_eq!(Some(settings.name), name);
                }
                Err(StartupError::ConfigurationMissing(missing)) => {
                    prop_assert_eq!(missing, expected);
                }
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }
        }
    }
}
