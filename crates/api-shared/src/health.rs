use crate::types::HealthRes;

/// Health check shared by the REST API and the CLI.
#[derive(Clone, Debug, Default)]
pub struct HealthService;

impl HealthService {
    /// Report the service as healthy.
    ///
    /// # Returns
    /// A `HealthRes` with `ok` set and a short status message.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "MedLink is alive".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_ok() {
        let res = HealthService::check_health();
        assert!(res.ok);
        assert!(res.message.contains("alive"));
    }
}
