//! IdGenerator port - instance ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::InstanceId;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は衝突しない instance ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数の producer から使える）
pub trait IdGenerator: Send + Sync {
    fn generate_instance_id(&self) -> InstanceId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock から timestamp 部分を、rand から 80 bit のランダム部分を作ります。
/// 同一ミリ秒内でもランダム部分で衝突を避けます。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_instance_id(&self) -> InstanceId {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        InstanceId::from(ulid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(SystemClock);
        let ids: HashSet<_> = (0..1000).map(|_| id_gen.generate_instance_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn ulid_generator_with_fixed_clock_shares_timestamp() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let id1 = id_gen.generate_instance_id();
        let id2 = id_gen.generate_instance_id();

        // ランダム部分があるので ID は異なる
        assert_ne!(id1, id2);

        let ulid1 = Ulid::from_string(id1.as_str()).unwrap();
        let ulid2 = Ulid::from_string(id2.as_str()).unwrap();
        assert_eq!(ulid1.timestamp_ms(), ulid2.timestamp_ms());
        assert_eq!(ulid1.timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }
}
