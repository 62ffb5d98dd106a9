use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Creation/modification instants carried by every persisted entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Timestamps {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
        }
    }

    /// Applied on every write after the first.
    pub fn touched(self, now: DateTime<Utc>) -> Self {
        Self {
            created_at: self.created_at,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn touch_keeps_creation_instant() {
        let t0 = Utc::now();
        let stamps = Timestamps::new(t0).touched(t0 + Duration::seconds(5));
        assert_eq!(stamps.created_at, t0);
        assert_eq!(stamps.updated_at, t0 + Duration::seconds(5));
    }
}
