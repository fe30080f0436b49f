use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub definitions_dir: String,
    pub rescan_seconds: u64,
    pub tick_seconds: u64,
    pub kubectl_bin: String,
    pub dry_run: bool,
}

impl Config {
    pub fn init() -> Config {
        let definitions_dir = std::env::var("KUBETASK_DEFINITIONS_DIR")
            .unwrap_or_else(|_| "definitions".to_owned());
        let rescan_seconds = std::env::var("KUBETASK_RESCAN_SECONDS")
            .unwrap_or_else(|_| "60".to_owned())
            .parse::<u64>()
            .expect("KUBETASK_RESCAN_SECONDS must be a number");
        let tick_seconds = std::env::var("KUBETASK_TICK_SECONDS")
            .unwrap_or_else(|_| "15".to_owned())
            .parse::<u64>()
            .expect("KUBETASK_TICK_SECONDS must be a number");
        let kubectl_bin =
            std::env::var("KUBETASK_KUBECTL_BIN").unwrap_or_else(|_| "kubectl".to_owned());
        let dry_run = std::env::var("KUBETASK_DRY_RUN")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Config {
            definitions_dir,
            rescan_seconds,
            tick_seconds,
            kubectl_bin,
            dry_run,
        }
    }
}
