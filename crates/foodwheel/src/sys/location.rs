use crate::config::LocationConfig;
use nearby::Coordinate;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("location access denied")]
    Denied,
    #[error("location unavailable")]
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixSource {
    Located,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub coordinate: Coordinate,
    pub source: FixSource,
}

impl Fix {
    pub fn located(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            source: FixSource::Located,
        }
    }

    pub fn fallback(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            source: FixSource::Fallback,
        }
    }

    pub fn is_located(&self) -> bool {
        self.source == FixSource::Located
    }
}

/// Best-effort provider of the user's position.
pub trait LocationSource {
    fn locate(&self) -> impl Future<Output = Result<Coordinate, LocationError>> + Send;
}

/// A position pinned in the config; absent means unavailable.
#[derive(Debug, Clone, Copy)]
pub struct ConfiguredLocation(pub Option<Coordinate>);

impl ConfiguredLocation {
    pub fn from_config(config: &LocationConfig) -> Self {
        Self(config.coordinate())
    }
}

impl LocationSource for ConfiguredLocation {
    async fn locate(&self) -> Result<Coordinate, LocationError> {
        match self.0 {
            Some(c) if c.is_valid() => Ok(c),
            Some(_) => Err(LocationError::Denied),
            None => Err(LocationError::Unavailable),
        }
    }
}

pub async fn locate_or_fallback<L: LocationSource>(
    source: &L,
    timeout: Duration,
    fallback: Coordinate,
) -> Fix {
    match tokio::time::timeout(timeout, source.locate()).await {
        Ok(Ok(coordinate)) => Fix::located(coordinate),
        Ok(Err(e)) => {
            log::warn!("{}, using fallback location", e);
            Fix::fallback(fallback)
        }
        Err(_) => {
            log::warn!("Location lookup timed out after {:?}, using fallback", timeout);
            Fix::fallback(fallback)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverAnswers;

    impl LocationSource for NeverAnswers {
        async fn locate(&self) -> Result<Coordinate, LocationError> {
            std::future::pending().await
        }
    }

    const SHORT: Duration = Duration::from_millis(20);

    #[tokio::test]
    async fn test_configured_position_is_used() {
        let here = Coordinate::new(1.3521, 103.8198);
        let fix = locate_or_fallback(
            &ConfiguredLocation(Some(here)),
            SHORT,
            Coordinate::KUALA_LUMPUR,
        )
        .await;
        assert_eq!(fix, Fix::located(here));
    }

    #[tokio::test]
    async fn test_unavailable_falls_back() {
        let fix = locate_or_fallback(&ConfiguredLocation(None), SHORT, Coordinate::KUALA_LUMPUR).await;
        assert_eq!(fix, Fix::fallback(Coordinate::KUALA_LUMPUR));
        assert!(!fix.is_located());
    }

    #[tokio::test]
    async fn test_denied_falls_back() {
        let bogus = ConfiguredLocation(Some(Coordinate::new(123.0, 0.0)));
        assert_eq!(bogus.locate().await, Err(LocationError::Denied));
        let fix = locate_or_fallback(&bogus, SHORT, Coordinate::KUALA_LUMPUR).await;
        assert_eq!(fix.source, FixSource::Fallback);
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let fix = locate_or_fallback(&NeverAnswers, SHORT, Coordinate::KUALA_LUMPUR).await;
        assert_eq!(fix, Fix::fallback(Coordinate::KUALA_LUMPUR));
    }
}
