//! 测试辅助：内存仓储与可编程积分服务 mock
//!
//! 单元测试以内存实现替代 Postgres，语义与 SQL 实现保持一致：
//! - 插入去重遵循 (user_id, reward_type, feed_id) 唯一约束的 NULL distinct 语义
//! - 认领/落账遵循状态机的条件更新语义

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{Result, RewardError};
use crate::ledger::{Ledger, LedgerError};
use crate::models::{EventStatus, NewRewardEvent, RewardEvent, RewardPolicy, RewardType};
use crate::repository::traits::{RewardEventRepositoryTrait, RewardPolicyRepositoryTrait};
use crate::repository::{DailyStatRow, EventFilter};

/// 内存策略仓储
#[derive(Default)]
pub struct InMemoryPolicyRepo {
    policies: Mutex<HashMap<RewardType, RewardPolicy>>,
}

impl InMemoryPolicyRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入一条策略（active = false 的策略等同于未配置）
    pub fn put(&self, policy: RewardPolicy) {
        self.policies
            .lock()
            .unwrap()
            .insert(policy.reward_type, policy);
    }
}

#[async_trait]
impl RewardPolicyRepositoryTrait for InMemoryPolicyRepo {
    async fn find_active_policy(&self, reward_type: RewardType) -> Result<Option<RewardPolicy>> {
        let policies = self.policies.lock().unwrap();
        Ok(policies.get(&reward_type).filter(|p| p.active).cloned())
    }
}

/// 内存事件仓储
#[derive(Default)]
pub struct InMemoryEventRepo {
    events: Mutex<Vec<RewardEvent>>,
    next_id: AtomicI64,
    /// 置位后所有操作返回数据库错误，用于验证存储故障的吞错路径
    fail_storage: AtomicBool,
}

impl InMemoryEventRepo {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Self::default()
        }
    }

    pub fn set_fail_storage(&self, fail: bool) {
        self.fail_storage.store(fail, Ordering::SeqCst);
    }

    /// 直接写入一条事件（测试预置数据用）
    pub fn seed(&self, mut event: RewardEvent) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        event.id = id;
        self.events.lock().unwrap().push(event);
        id
    }

    pub fn all(&self) -> Vec<RewardEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn get(&self, event_id: i64) -> Option<RewardEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == event_id)
            .cloned()
    }

    fn check_storage(&self) -> Result<()> {
        if self.fail_storage.load(Ordering::SeqCst) {
            return Err(RewardError::Database(sqlx::Error::PoolClosed));
        }
        Ok(())
    }

    fn matches(filter: &EventFilter, event: &RewardEvent) -> bool {
        filter.user_id.as_deref().is_none_or(|u| event.user_id == u)
            && filter.feed_id.is_none_or(|f| event.feed_id == Some(f))
            && filter.reward_type.is_none_or(|t| event.reward_type == t)
            && filter.status.is_none_or(|s| event.status == s)
    }
}

#[async_trait]
impl RewardEventRepositoryTrait for InMemoryEventRepo {
    async fn insert_if_absent(&self, event: &NewRewardEvent) -> Result<Option<i64>> {
        self.check_storage()?;
        let mut events = self.events.lock().unwrap();

        // NULL distinct：仅 feed_id 非空的事件参与唯一约束
        if let Some(feed_id) = event.feed_id {
            let duplicate = events.iter().any(|e| {
                e.user_id == event.user_id
                    && e.reward_type == event.reward_type
                    && e.feed_id == Some(feed_id)
            });
            if duplicate {
                return Ok(None);
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        events.push(RewardEvent {
            id,
            user_id: event.user_id.clone(),
            feed_id: event.feed_id,
            reward_type: event.reward_type,
            points: event.points,
            badge_points: event.badge_points,
            description: event.description.clone(),
            related_data: event.related_data.clone(),
            status: EventStatus::Pending,
            retry_count: 0,
            created_at: now,
            updated_at: now,
        });

        Ok(Some(id))
    }

    async fn exists_for_feed(
        &self,
        user_id: &str,
        feed_id: i64,
        reward_type: RewardType,
    ) -> Result<bool> {
        self.check_storage()?;
        let events = self.events.lock().unwrap();
        Ok(events.iter().any(|e| {
            e.user_id == user_id && e.feed_id == Some(feed_id) && e.reward_type == reward_type
        }))
    }

    async fn count_created_since(
        &self,
        user_id: &str,
        reward_type: RewardType,
        since: DateTime<Utc>,
    ) -> Result<i64> {
        self.check_storage()?;
        let events = self.events.lock().unwrap();
        Ok(events
            .iter()
            .filter(|e| {
                e.user_id == user_id && e.reward_type == reward_type && e.created_at >= since
            })
            .count() as i64)
    }

    async fn find_by_id(&self, event_id: i64) -> Result<Option<RewardEvent>> {
        self.check_storage()?;
        Ok(self.get(event_id))
    }

    async fn claim_for_processing(&self, event_id: i64) -> Result<bool> {
        self.check_storage()?;
        let mut events = self.events.lock().unwrap();
        match events
            .iter_mut()
            .find(|e| e.id == event_id && e.status.is_claimable())
        {
            Some(event) => {
                event.status = EventStatus::Processing;
                event.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_processed(&self, event_id: i64) -> Result<bool> {
        self.check_storage()?;
        let mut events = self.events.lock().unwrap();
        match events
            .iter_mut()
            .find(|e| e.id == event_id && e.status == EventStatus::Processing)
        {
            Some(event) => {
                event.status = EventStatus::Processed;
                event.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_failed(&self, event_id: i64) -> Result<bool> {
        self.check_storage()?;
        let mut events = self.events.lock().unwrap();
        match events
            .iter_mut()
            .find(|e| e.id == event_id && e.status == EventStatus::Processing)
        {
            Some(event) => {
                event.status = EventStatus::Failed;
                event.retry_count += 1;
                event.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_claimable(
        &self,
        status: EventStatus,
        max_retry_count: i32,
        limit: i64,
    ) -> Result<Vec<RewardEvent>> {
        self.check_storage()?;
        let events = self.events.lock().unwrap();
        let mut matched: Vec<RewardEvent> = events
            .iter()
            .filter(|e| e.status == status && e.retry_count < max_retry_count)
            .cloned()
            .collect();
        matched.sort_by_key(|e| e.created_at);
        matched.truncate(limit as usize);
        Ok(matched)
    }

    async fn requeue_stale_processing(&self, stale_before: DateTime<Utc>) -> Result<u64> {
        self.check_storage()?;
        let mut events = self.events.lock().unwrap();
        let mut requeued = 0;
        for event in events
            .iter_mut()
            .filter(|e| e.status == EventStatus::Processing && e.updated_at < stale_before)
        {
            event.status = EventStatus::Failed;
            event.retry_count += 1;
            event.updated_at = Utc::now();
            requeued += 1;
        }
        Ok(requeued)
    }

    async fn list_events(
        &self,
        filter: &EventFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<RewardEvent>> {
        self.check_storage()?;
        let events = self.events.lock().unwrap();
        let mut matched: Vec<RewardEvent> = events
            .iter()
            .filter(|e| Self::matches(filter, e))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(matched
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_events(&self, filter: &EventFilter) -> Result<i64> {
        self.check_storage()?;
        let events = self.events.lock().unwrap();
        Ok(events.iter().filter(|e| Self::matches(filter, e)).count() as i64)
    }

    async fn count_by_status(&self) -> Result<Vec<(EventStatus, i64)>> {
        self.check_storage()?;
        let events = self.events.lock().unwrap();
        let mut counts: HashMap<EventStatus, i64> = HashMap::new();
        for event in events.iter() {
            *counts.entry(event.status).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }

    async fn count_by_type(&self) -> Result<Vec<(RewardType, i64)>> {
        self.check_storage()?;
        let events = self.events.lock().unwrap();
        let mut counts: HashMap<RewardType, i64> = HashMap::new();
        for event in events.iter() {
            *counts.entry(event.reward_type).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }

    async fn sum_processed_points(&self) -> Result<i64> {
        self.check_storage()?;
        let events = self.events.lock().unwrap();
        Ok(events
            .iter()
            .filter(|e| e.status == EventStatus::Processed)
            .map(|e| e.points as i64)
            .sum())
    }

    async fn daily_stats(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DailyStatRow>> {
        self.check_storage()?;
        let events = self.events.lock().unwrap();
        let mut buckets: HashMap<chrono::NaiveDate, DailyStatRow> = HashMap::new();
        for event in events
            .iter()
            .filter(|e| e.created_at >= start && e.created_at < end)
        {
            let day = event.created_at.date_naive();
            let row = buckets.entry(day).or_insert_with(|| DailyStatRow {
                day,
                created_count: 0,
                processed_count: 0,
                processed_points: 0,
            });
            row.created_count += 1;
            if event.status == EventStatus::Processed {
                row.processed_count += 1;
                row.processed_points += event.points as i64;
            }
        }
        let mut rows: Vec<DailyStatRow> = buckets.into_values().collect();
        rows.sort_by_key(|r| r.day);
        Ok(rows)
    }
}

/// 可编程积分服务 mock
///
/// 前 fail_first 次调用失败，之后成功；记录总调用次数，
/// 用于验证"同一事件至多入账一次"。
#[derive(Default)]
pub struct MockLedger {
    fail_first: AtomicU32,
    calls: AtomicU32,
    /// 置位后每次调用都挂起直到超时（模拟账本无响应）
    hang: AtomicBool,
}

impl MockLedger {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing_times(n: u32) -> Self {
        let ledger = Self::default();
        ledger.fail_first.store(n, Ordering::SeqCst);
        ledger
    }

    pub fn hanging() -> Self {
        let ledger = Self::default();
        ledger.hang.store(true, Ordering::SeqCst);
        ledger
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn credit(
        &self,
        _user_id: &str,
        _points: i32,
        _badge_points: i32,
    ) -> std::result::Result<(), LedgerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.hang.load(Ordering::SeqCst) {
            // 处理器的超时包装负责打断
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        }

        let remaining = self.fail_first.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_first.store(remaining - 1, Ordering::SeqCst);
            return Err(LedgerError::Unavailable("模拟账本故障".to_string()));
        }

        Ok(())
    }
}
