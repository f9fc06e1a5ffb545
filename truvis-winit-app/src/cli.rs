use std::path::PathBuf;

/// clear-screen 的命令行参数
#[derive(clap::Parser, Debug)]
#[command(about = "Truvis frame pipeline demo: clears the window with a time-varying color", long_about = None)]
pub struct CliArgs {
    /// FrameSettings 的 toml 文件，缺失的字段使用默认值
    #[arg(long, env = "TRUVIS_FRAME_CONFIG")]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_config_flag_forms() {
        let args = CliArgs::try_parse_from(["clear-screen", "--config", "settings.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("settings.toml")));

        let args = CliArgs::try_parse_from(["clear-screen", "--config=settings.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("settings.toml")));
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(CliArgs::try_parse_from(["clear-screen", "--confg", "settings.toml"]).is_err());
    }

    #[test]
    fn test_missing_value_rejected() {
        assert!(CliArgs::try_parse_from(["clear-screen", "--config"]).is_err());
    }
}
