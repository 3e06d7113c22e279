//! Import bookkeeping: double-import guard and daily mint allowance

use crate::record::{ExportRecord, ImportRecord};
use metro_core::{Amount, ChainId, MetroError, Result, UnixTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mint allowance of one UTC day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyAllowance {
    /// Day index since the Unix epoch
    pub day: u64,
    /// Units still importable that day
    pub remaining: Amount,
}

/// Import validated against the ledger, ready to commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedImport {
    record: ImportRecord,
    allowance: DailyAllowance,
}

impl StagedImport {
    /// Entry that will be stored
    pub fn record(&self) -> &ImportRecord {
        &self.record
    }
}

/// Imports accepted by this ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportLedger {
    imported: BTreeMap<(ChainId, u64), ImportRecord>,
    allowance: Option<DailyAllowance>,
}

impl ImportLedger {
    /// Empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `(source, sequence)` was already imported
    pub fn is_imported(&self, source: ChainId, sequence: u64) -> bool {
        self.imported.contains_key(&(source, sequence))
    }

    /// Stored entry for `(source, sequence)`
    pub fn import_record(&self, source: ChainId, sequence: u64) -> Option<&ImportRecord> {
        self.imported.get(&(source, sequence))
    }

    /// All imports ordered by source chain and sequence
    pub fn imports(&self) -> impl Iterator<Item = &ImportRecord> {
        self.imported.values()
    }

    /// Number of accepted imports
    pub fn len(&self) -> usize {
        self.imported.len()
    }

    /// True before the first import
    pub fn is_empty(&self) -> bool {
        self.imported.is_empty()
    }

    /// Allowance left on `day`, or `None` if nothing was imported that day
    pub fn remaining_allowance(&self, day: u64) -> Option<Amount> {
        self.allowance
            .filter(|a| a.day == day)
            .map(|a| a.remaining)
    }

    /// Check the replay guard and the daily allowance for `record` at `now`.
    ///
    /// The first import of a day opens that day's allowance at
    /// `daily_mintable`, the importing ledger's own daily issuance.
    pub fn stage(
        &self,
        record: &ExportRecord,
        daily_mintable: Amount,
        now: UnixTime,
    ) -> Result<StagedImport> {
        if self.is_imported(record.source_chain, record.burn_sequence) {
            return Err(MetroError::already_imported(
                record.source_chain,
                record.burn_sequence,
            ));
        }
        if record.amount_burned == 0 {
            return Err(MetroError::invalid("Import amount must be positive"));
        }

        let day = now.day_index();
        let remaining = self.remaining_allowance(day).unwrap_or(daily_mintable);
        let left = remaining
            .checked_sub(record.amount_burned)
            .ok_or_else(|| MetroError::daily_limit_exceeded(record.amount_burned, remaining))?;

        Ok(StagedImport {
            record: ImportRecord {
                source_chain: record.source_chain,
                burn_sequence: record.burn_sequence,
                amount_minted: record.amount_burned,
                imported_at: now,
                recipient: record.recipient,
                export_hash: record.current_hash,
            },
            allowance: DailyAllowance {
                day,
                remaining: left,
            },
        })
    }

    /// Store a staged import and consume its allowance
    pub fn commit(&mut self, staged: StagedImport) -> Result<()> {
        let key = (staged.record.source_chain, staged.record.burn_sequence);
        if self.imported.contains_key(&key) {
            return Err(MetroError::already_imported(key.0, key.1));
        }
        self.allowance = Some(staged.allowance);
        self.imported.insert(key, staged.record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metro_core::{AccountId, Hash32, SECONDS_PER_DAY};

    const T: u64 = 1_700_006_400;

    fn record(sequence: u64, amount: Amount) -> ExportRecord {
        ExportRecord {
            source_chain: ChainId::new("ETC").unwrap(),
            burn_sequence: sequence,
            destination_chain: ChainId::new("ETH").unwrap(),
            destination_contract: AccountId::from_label("eth-token"),
            recipient: AccountId::from_label("alice"),
            amount_burned: amount,
            extra_data: Vec::new(),
            tick_at_export: 0,
            daily_mintable: 100,
            supply_on_all_chains: [0; 6],
            genesis_time: UnixTime(T),
            prev_hash: Hash32::ZERO,
            current_hash: Hash32::digest(&sequence.to_be_bytes()),
        }
    }

    fn import(ledger: &mut ImportLedger, record: &ExportRecord, now: u64) -> Result<()> {
        let staged = ledger.stage(record, 100, UnixTime(now))?;
        ledger.commit(staged)
    }

    #[test]
    fn test_double_import_rejected() {
        let mut ledger = ImportLedger::new();
        let r = record(1, 10);
        import(&mut ledger, &r, T).unwrap();
        assert!(ledger.is_imported(r.source_chain, 1));
        assert!(matches!(
            import(&mut ledger, &r, T),
            Err(MetroError::AlreadyImported { sequence: 1, .. })
        ));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.remaining_allowance(T / SECONDS_PER_DAY), Some(90));
    }

    #[test]
    fn test_daily_allowance_consumed_and_reset() {
        let mut ledger = ImportLedger::new();
        import(&mut ledger, &record(1, 60), T).unwrap();
        let err = import(&mut ledger, &record(2, 41), T + 10).unwrap_err();
        assert_eq!(err, MetroError::daily_limit_exceeded(41, 40));
        import(&mut ledger, &record(2, 40), T + 20).unwrap();
        assert_eq!(ledger.remaining_allowance(T / SECONDS_PER_DAY), Some(0));

        // next UTC day starts fresh
        import(&mut ledger, &record(3, 100), T + SECONDS_PER_DAY).unwrap();
        assert!(import(&mut ledger, &record(4, 1), T + SECONDS_PER_DAY).is_err());
    }

    #[test]
    fn test_zero_amount_rejected() {
        let ledger = ImportLedger::new();
        assert!(matches!(
            ledger.stage(&record(1, 0), 100, UnixTime(T)),
            Err(MetroError::Invalid { .. })
        ));
    }

    #[test]
    fn test_failed_stage_leaves_allowance() {
        let mut ledger = ImportLedger::new();
        import(&mut ledger, &record(1, 30), T).unwrap();
        assert!(import(&mut ledger, &record(2, 500), T).is_err());
        assert_eq!(ledger.remaining_allowance(T / SECONDS_PER_DAY), Some(70));
        assert!(ledger.import_record(ChainId::new("ETC").unwrap(), 2).is_none());
    }

    #[test]
    fn test_allowance_ignores_record_daily_mintable() {
        let mut ledger = ImportLedger::new();
        let mut inflated = record(1, 80);
        inflated.daily_mintable = Amount::MAX;
        let staged = ledger.stage(&inflated, 100, UnixTime(T)).unwrap();
        ledger.commit(staged).unwrap();
        assert_eq!(ledger.remaining_allowance(T / SECONDS_PER_DAY), Some(20));

        let mut second = record(2, 30);
        second.daily_mintable = Amount::MAX;
        assert_eq!(
            ledger.stage(&second, 100, UnixTime(T)).unwrap_err(),
            MetroError::daily_limit_exceeded(30, 20)
        );
    }
}
