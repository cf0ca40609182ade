use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Agent 配置（推理服务与编排循环）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    /// 单次交换允许的推理服务调用上限
    pub max_iterations: usize,
    pub system_prompt: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            model: "gpt-4-0613".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            max_iterations: 10,
            system_prompt: "You are a helpful travel assistant.".to_string(),
        }
    }
}

/// Server 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "0.0.0.0:3000".to_string(),
            request_timeout_secs: 60,
        }
    }
}

/// 第三方数据源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub rapidapi_key: String,
    pub weather_api_key: String,
    pub weather_base_url: String,
    pub flights_host: String,
    pub flights_base_url: String,
    pub hotels_host: String,
    pub hotels_base_url: String,
    pub hotel_currency: String,
    pub hotel_locale: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            rapidapi_key: String::new(),
            weather_api_key: String::new(),
            weather_base_url: "https://api.openweathermap.org/data/2.5".to_string(),
            flights_host: "flights-sky.p.rapidapi.com".to_string(),
            flights_base_url: "https://flights-sky.p.rapidapi.com".to_string(),
            hotels_host: "booking-com.p.rapidapi.com".to_string(),
            hotels_base_url: "https://booking-com.p.rapidapi.com".to_string(),
            hotel_currency: "INR".to_string(),
            hotel_locale: "en-gb".to_string(),
        }
    }
}

/// 统一配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub agent: AgentConfig,
    pub server: ServerConfig,
    pub providers: ProviderConfig,
}

impl Config {
    /// 从文件加载配置，文件不存在时使用默认值
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;

        Ok(config)
    }

    /// 保存配置到文件
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 默认配置文件位置：~/.tripmate/config.toml
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tripmate")
            .join("config.toml")
    }

    /// 进程启动时构建：文件 + 环境变量覆盖
    pub fn from_startup(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        let mut config = Self::load(&path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// 用环境变量覆盖密钥等字段；`lookup` 便于测试注入
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |target: &mut String, key: &str| {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *target = value;
            }
        };

        set(&mut self.agent.api_key, "OPENAI_API_KEY");
        set(&mut self.agent.model, "OPENAI_MODEL");
        set(&mut self.agent.base_url, "OPENAI_BASE_URL");
        set(&mut self.providers.rapidapi_key, "RAPIDAPI_KEY");
        set(&mut self.providers.weather_api_key, "WEATHERAPI_KEY");
        set(&mut self.server.bind, "TRIPMATE_BIND");
    }
}
