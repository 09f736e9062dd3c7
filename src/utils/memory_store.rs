//! In-memory posting store for testing and development

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::traits::*;
use crate::types::*;

#[derive(Debug, Default)]
struct Inner {
    ledgers: HashMap<LedgerId, Ledger>,
    vouchers: HashMap<VoucherId, Voucher>,
    next_entry_seq: u64,
    farmer_versions: HashMap<String, u64>,
}

impl Inner {
    fn find_by_name(&self, name: &str) -> Option<&Ledger> {
        let lowered = name.to_lowercase();
        self.ledgers
            .values()
            .find(|ledger| ledger.name.to_lowercase() == lowered)
    }

    fn number_taken(&self, voucher_type: VoucherType, number: &str) -> bool {
        self.vouchers
            .values()
            .any(|v| v.voucher_type == voucher_type && v.number == number)
    }

    /// Appends under an already-held write lock: the duplicate-number
    /// check and the entry sequence assignment happen in one step.
    fn store_voucher(&mut self, voucher: &Voucher) -> LedgerResult<Voucher> {
        if self.number_taken(voucher.voucher_type, &voucher.number) {
            return Err(LedgerError::DuplicateVoucherNumber {
                voucher_type: voucher.voucher_type,
                number: voucher.number.clone(),
            });
        }

        self.next_entry_seq += 1;
        let mut stored = voucher.clone();
        stored.entry_seq = self.next_entry_seq;
        self.vouchers.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn bump_farmer_version(&mut self, farmer_id: &str) {
        *self
            .farmer_versions
            .entry(farmer_id.to_string())
            .or_insert(0) += 1;
    }
}

fn records_of(voucher: &Voucher) -> impl Iterator<Item = PostingRecord> + '_ {
    voucher
        .postings
        .iter()
        .enumerate()
        .map(move |(line_no, posting)| PostingRecord {
            voucher_id: voucher.id,
            voucher_type: voucher.voucher_type,
            voucher_number: voucher.number.clone(),
            date: voucher.date,
            entry_seq: voucher.entry_seq,
            line_no,
            posting: posting.clone(),
        })
}

fn sort_records(records: &mut [PostingRecord]) {
    records.sort_by_key(|r| (r.date, r.entry_seq, r.line_no));
}

/// In-memory posting store backed by a single `RwLock`, so every append
/// observes a consistent view of the log. The handle is cheap to clone;
/// clones share the same underlying books.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap();
        *inner = Inner::default();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PostingStore for MemoryStore {
    async fn save_ledger(&self, ledger: &Ledger) -> LedgerResult<()> {
        let mut inner = self.inner.write().unwrap();
        if inner.find_by_name(&ledger.name).is_some() {
            return Err(LedgerError::DuplicateLedgerName(ledger.name.clone()));
        }
        inner.ledgers.insert(ledger.id, ledger.clone());
        Ok(())
    }

    async fn get_ledger(&self, ledger_id: LedgerId) -> LedgerResult<Option<Ledger>> {
        Ok(self.inner.read().unwrap().ledgers.get(&ledger_id).cloned())
    }

    async fn find_ledger_by_name(&self, name: &str) -> LedgerResult<Option<Ledger>> {
        Ok(self.inner.read().unwrap().find_by_name(name).cloned())
    }

    async fn list_ledgers(&self, ledger_type: Option<LedgerType>) -> LedgerResult<Vec<Ledger>> {
        let inner = self.inner.read().unwrap();
        let mut ledgers: Vec<Ledger> = inner
            .ledgers
            .values()
            .filter(|ledger| ledger_type.is_none_or(|t| ledger.ledger_type == t))
            .cloned()
            .collect();
        ledgers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(ledgers)
    }

    async fn update_ledger(&self, ledger: &Ledger) -> LedgerResult<()> {
        let mut inner = self.inner.write().unwrap();
        if !inner.ledgers.contains_key(&ledger.id) {
            return Err(LedgerError::UnknownLedger(ledger.name.clone()));
        }
        inner.ledgers.insert(ledger.id, ledger.clone());
        Ok(())
    }

    async fn posted_ledger_ids(&self) -> LedgerResult<Vec<LedgerId>> {
        let inner = self.inner.read().unwrap();
        let ids: HashSet<LedgerId> = inner
            .vouchers
            .values()
            .flat_map(|v| v.postings.iter().map(|p| p.ledger_id))
            .collect();
        Ok(ids.into_iter().collect())
    }

    async fn append_voucher(&self, voucher: &Voucher) -> LedgerResult<Voucher> {
        self.inner.write().unwrap().store_voucher(voucher)
    }

    async fn append_voucher_for_farmer(
        &self,
        voucher: &Voucher,
        farmer_id: &str,
        expected_version: u64,
    ) -> LedgerResult<Voucher> {
        let mut inner = self.inner.write().unwrap();
        let current = inner.farmer_versions.get(farmer_id).copied().unwrap_or(0);
        if current != expected_version {
            return Err(LedgerError::ConcurrentOutstandingConflict(
                farmer_id.to_string(),
            ));
        }
        let stored = inner.store_voucher(voucher)?;
        inner.bump_farmer_version(farmer_id);
        Ok(stored)
    }

    async fn get_voucher(&self, voucher_id: VoucherId) -> LedgerResult<Option<Voucher>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .vouchers
            .get(&voucher_id)
            .cloned())
    }

    async fn find_voucher_by_number(
        &self,
        voucher_type: VoucherType,
        number: &str,
    ) -> LedgerResult<Option<Voucher>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .vouchers
            .values()
            .find(|v| v.voucher_type == voucher_type && v.number == number)
            .cloned())
    }

    async fn mark_cancelled(&self, voucher_id: VoucherId, reason: &str) -> LedgerResult<Voucher> {
        let mut inner = self.inner.write().unwrap();

        let voucher = inner
            .vouchers
            .get_mut(&voucher_id)
            .ok_or(LedgerError::VoucherNotFound(voucher_id))?;
        if voucher.status == VoucherStatus::Cancelled {
            return Err(LedgerError::AlreadyCancelled(voucher_id));
        }

        voucher.status = VoucherStatus::Cancelled;
        voucher.cancel_reason = Some(reason.to_string());
        voucher.cancelled_at = Some(chrono::Utc::now().naive_utc());
        let cancelled = voucher.clone();

        // Cancelling changes the outstanding of every tagged farmer
        let farmers: HashSet<String> = cancelled
            .postings
            .iter()
            .filter_map(|p| p.advance.as_ref().map(|tag| tag.farmer_id.clone()))
            .collect();
        for farmer_id in farmers {
            inner.bump_farmer_version(&farmer_id);
        }

        Ok(cancelled)
    }

    async fn vouchers_in(
        &self,
        period: Option<Period>,
        filter: StatusFilter,
    ) -> LedgerResult<Vec<Voucher>> {
        let inner = self.inner.read().unwrap();
        let mut vouchers: Vec<Voucher> = inner
            .vouchers
            .values()
            .filter(|v| filter.admits(v.status))
            .filter(|v| period.is_none_or(|p| p.contains(v.date)))
            .cloned()
            .collect();
        vouchers.sort_by_key(|v| (v.date, v.entry_seq));
        Ok(vouchers)
    }

    async fn postings_for(
        &self,
        ledger_id: LedgerId,
        period: Option<Period>,
        filter: StatusFilter,
    ) -> LedgerResult<Vec<PostingRecord>> {
        let inner = self.inner.read().unwrap();
        let mut records: Vec<PostingRecord> = inner
            .vouchers
            .values()
            .filter(|v| filter.admits(v.status))
            .filter(|v| period.is_none_or(|p| p.contains(v.date)))
            .flat_map(records_of)
            .filter(|r| r.posting.ledger_id == ledger_id)
            .collect();
        sort_records(&mut records);
        Ok(records)
    }

    async fn postings_until(
        &self,
        end: NaiveDate,
        filter: StatusFilter,
    ) -> LedgerResult<Vec<PostingRecord>> {
        let inner = self.inner.read().unwrap();
        let mut records: Vec<PostingRecord> = inner
            .vouchers
            .values()
            .filter(|v| filter.admits(v.status))
            .filter(|v| v.date <= end)
            .flat_map(records_of)
            .collect();
        sort_records(&mut records);
        Ok(records)
    }

    async fn advance_postings(
        &self,
        farmer_id: &str,
        filter: StatusFilter,
    ) -> LedgerResult<Vec<PostingRecord>> {
        let inner = self.inner.read().unwrap();
        let mut records: Vec<PostingRecord> = inner
            .vouchers
            .values()
            .filter(|v| filter.admits(v.status))
            .flat_map(records_of)
            .filter(|r| {
                r.posting
                    .advance
                    .as_ref()
                    .is_some_and(|tag| tag.farmer_id == farmer_id)
            })
            .collect();
        sort_records(&mut records);
        Ok(records)
    }

    async fn farmer_version(&self, farmer_id: &str) -> LedgerResult<u64> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .farmer_versions
            .get(farmer_id)
            .copied()
            .unwrap_or(0))
    }
}
