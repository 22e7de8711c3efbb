//! Server configuration
//!
//! All settings come from environment variables and are passed explicitly
//! into the router state; nothing reads process-wide configuration later.

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP listener binds to
    pub bind_addr: String,

    /// Cloud region every provisioning call targets
    pub region: String,

    /// Bearer token required on stack routes; when unset the gate admits
    /// all callers (development mode)
    pub api_token: Option<String>,

    /// Binary name (or path) of the infrastructure provisioning tool
    pub provisioner_bin: String,

    /// Binary name (or path) of the artifact registry tool
    pub registry_bin: String,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - STRATO_REGION (required)
    /// - STRATO_BIND_ADDR (optional, default: 0.0.0.0:8080)
    /// - STRATO_API_TOKEN (optional)
    /// - STRATO_PROVISIONER_BIN (optional, default: stackctl)
    /// - STRATO_REGISTRY_BIN (optional, default: regctl)
    pub fn from_env() -> anyhow::Result<Self> {
        let region = std::env::var("STRATO_REGION")
            .map_err(|_| anyhow::anyhow!("STRATO_REGION environment variable not set"))?;

        let bind_addr =
            std::env::var("STRATO_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let api_token = std::env::var("STRATO_API_TOKEN").ok();

        let provisioner_bin =
            std::env::var("STRATO_PROVISIONER_BIN").unwrap_or_else(|_| "stackctl".to_string());

        let registry_bin =
            std::env::var("STRATO_REGISTRY_BIN").unwrap_or_else(|_| "regctl".to_string());

        let config = Self {
            bind_addr,
            region,
            api_token,
            provisioner_bin,
            registry_bin,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.region.is_empty() {
            anyhow::bail!("region cannot be empty");
        }

        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.provisioner_bin.is_empty() {
            anyhow::bail!("provisioner_bin cannot be empty");
        }

        if self.registry_bin.is_empty() {
            anyhow::bail!("registry_bin cannot be empty");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            bind_addr: "0.0.0.0:8080".to_string(),
            region: "eu-west-1".to_string(),
            api_token: None,
            provisioner_bin: "stackctl".to_string(),
            registry_bin: "regctl".to_string(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_empty_region_rejected() {
        let mut config = sample();
        config.region = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_bind_addr_rejected() {
        let mut config = sample();
        config.bind_addr = String::new();
        assert!(config.validate().is_err());
    }
}
