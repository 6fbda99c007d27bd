use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub com: ComConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub rocksdb_path: String,
}

/// 日志配置 / Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// 日志文件目录, 为空时只输出到控制台
    /// Log file directory, console only when absent
    pub directory: Option<String>,

    /// 日志文件名前缀 / Log file name prefix
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            file_prefix: default_file_prefix(),
        }
    }
}

fn default_file_prefix() -> String {
    "com-exchange.log".to_string()
}

/// COM 引擎配置 / COM engine configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ComConfig {
    /// 基础货币符号 / Base currency symbol
    pub core_symbol: String,

    /// 持有基金与池子资金的账户 / Account holding fund and pool tokens
    pub com_account: String,

    /// 名字竞拍收入账户 / Name-bid proceeds account
    pub names_account: String,

    /// 托管抵押代币的账户 / Account holding delegated stake tokens
    pub stake_account: String,

    /// 系统管理账户(可执行 setcom) / System account (may run setcom)
    pub system_account: String,

    /// 不允许排队卖单的创世账户 / Genesis account never allowed to queue sell orders
    pub bootstrap_account: String,

    /// 是否把手续费/竞拍收入导入 COM 池
    /// Whether fee and name-bid inflows are channeled into the COM pool
    pub channel_fees_to_com: bool,

    /// 每个操作前执行的维护配额 / Maintenance quota run before each action
    pub maintenance_quota: u16,
}

impl Default for ComConfig {
    fn default() -> Self {
        Self {
            core_symbol: "RIX".to_string(),
            com_account: "arisen.com".to_string(),
            names_account: "arisen.names".to_string(),
            stake_account: "arisen.stake".to_string(),
            system_account: "arisen".to_string(),
            bootstrap_account: "b1".to_string(),
            channel_fees_to_com: true,
            maintenance_quota: 2,
        }
    }
}

impl Config {
    pub fn new() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        Ok(config)
    }
}
