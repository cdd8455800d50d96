use clap::Parser;

/// Command-line interface of the proxy.
#[derive(Parser, Debug)]
#[command(name = "dockwatch", version, about = "Docker API usage metering proxy")]
pub struct Cli {
    /// Address to listen on (format: host:port or unix:/path/to/socket)
    #[arg(long, default_value = "localhost:8080")]
    pub listen: String,

    /// Address to forward to (format: host:port or unix:/path/to/socket)
    #[arg(long, default_value = "localhost:8081")]
    pub target: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// InfluxDB base URL
    #[arg(long, env = "DOCKWATCH_INFLUX_URL", default_value = "http://localhost:8086")]
    pub influx_url: String,

    /// InfluxDB API token
    #[arg(long, env = "DOCKWATCH_INFLUX_TOKEN", default_value = "", hide_env_values = true)]
    pub influx_token: String,

    /// InfluxDB organization
    #[arg(long, env = "DOCKWATCH_INFLUX_ORG", default_value = "")]
    pub influx_org: String,

    /// InfluxDB bucket
    #[arg(long, env = "DOCKWATCH_INFLUX_BUCKET", default_value = "")]
    pub influx_bucket: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub target_addr: String,
    pub debug: bool,
    pub influx: InfluxConfig,
}

/// Connection parameters for the metrics sink.
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
}

impl Config {
    pub fn from_cli(cli: Cli) -> anyhow::Result<Self> {
        if cli.listen.is_empty() || cli.target.is_empty() {
            anyhow::bail!("Both listen and target addresses must be specified");
        }

        Ok(Self {
            listen_addr: cli.listen,
            target_addr: cli.target,
            debug: cli.debug,
            influx: InfluxConfig {
                url: cli.influx_url,
                token: cli.influx_token,
                org: cli.influx_org,
                bucket: cli.influx_bucket,
            },
        })
    }
}
