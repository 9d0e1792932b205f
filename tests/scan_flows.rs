use std::sync::{Arc, Mutex};

use anyhow::Result;
use regex::Regex;
use rs_chain_diagnose::{
    chains::{ChainSpec, Protocol},
    core::{
        driver::{
            CancelSignal, EventSink, PositionSpace, RowScanSource, ScanDriver, StoreWalkSource,
        },
        partition::trx_row_ranges,
        tracker::SequenceTracker,
        types::{BlockRange, OutboundEvent, RangeStatus},
    },
    kvdb::{RowStore, rocksdb::RocksRowStore, schema::keys},
    store::fs::FsBlockStore,
};
use tempfile::TempDir;

#[derive(Default)]
struct CollectSink {
    events: Mutex<Vec<OutboundEvent>>,
}

impl CollectSink {
    fn block_ranges(&self) -> Vec<BlockRange> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                OutboundEvent::BlockRange(range) => Some(range.clone()),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for CollectSink {
    fn emit(&self, event: OutboundEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn write_archive_files(dir: &TempDir, base_nums: &[u32]) -> Result<()> {
    for num in base_nums {
        let name = format!("{num:010}.dat");
        std::fs::write(dir.path().join(name), b"blocks")?;
    }
    Ok(())
}

#[tokio::test]
async fn block_archive_scan_reports_holes_between_files() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_archive_files(&temp_dir, &[0, 100, 200, 500, 600])?;
    // A stray file the number pattern must skip.
    std::fs::write(temp_dir.path().join("README"), b"not a block file")?;

    let store = Arc::new(FsBlockStore::new(temp_dir.path())?);
    let mut source = StoreWalkSource::new(store, "", Regex::new(r"(\d{10})")?);
    let mut tracker = SequenceTracker::new(100, 10_000);
    let driver = ScanDriver::new(10_000, PositionSpace::Direct);
    let sink = CollectSink::default();

    let stats = driver
        .run(&mut source, &mut tracker, &sink, &CancelSignal::new())
        .await?;

    assert_eq!(stats.observations, 5);
    assert_eq!(
        sink.block_ranges(),
        vec![
            BlockRange::valid(0, 200, "valid range"),
            BlockRange::hole(300, 400, "hole found"),
            BlockRange::valid(500, 600, "valid range"),
        ]
    );
    Ok(())
}

fn complete_columns(spec: &ChainSpec) -> Vec<(&'static str, &'static str)> {
    spec.required_block_columns
        .iter()
        .map(|&qualifier| (qualifier, "x"))
        .collect()
}

#[tokio::test]
async fn db_scan_finds_presence_and_completeness_holes() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("kvdb");
    let spec = ChainSpec::for_protocol(Protocol::Eth);

    {
        let writer = RocksRowStore::open(&db_path)?;
        // Blocks 1..=6 except 4; block 3 misses its header column.
        for num in [1u32, 2, 3, 5, 6] {
            let columns = if num == 3 {
                vec![("meta:written", "x")]
            } else {
                complete_columns(spec)
            };
            writer.put_row(&spec.encode_block_row_key(num), &columns)?;
        }
    }

    let reader: Arc<dyn RowStore> = Arc::new(RocksRowStore::open_read_only(&db_path)?);
    let mut source = RowScanSource::new(reader, spec);
    let mut tracker = SequenceTracker::new(1, 200_000);
    let driver = ScanDriver::new(5_000, PositionSpace::InvertedU32);
    let sink = CollectSink::default();

    let stats = driver
        .run(&mut source, &mut tracker, &sink, &CancelSignal::new())
        .await?;
    assert_eq!(stats.observations, 5);

    let holes: Vec<BlockRange> = sink
        .block_ranges()
        .into_iter()
        .filter(|range| range.status == RangeStatus::Hole)
        .collect();
    assert!(holes.contains(&BlockRange::hole(4, 4, "hole found")));
    // The unseen block 4 also counts as unconfirmed, so the completeness
    // lag spans it together with the incomplete block 3.
    assert!(holes.contains(&BlockRange::hole(3, 4, "missing column(s)")));
    Ok(())
}

#[tokio::test]
async fn trx_partitions_cover_the_whole_table_exactly_once() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("kvdb");

    let ids = [
        format!("0{}", "a".repeat(63)),
        format!("3{}", "b".repeat(63)),
        format!("9{}", "c".repeat(63)),
        format!("f{}", "f".repeat(63)),
    ];
    {
        let writer = RocksRowStore::open(&db_path)?;
        for (index, id) in ids.iter().enumerate() {
            let columns: &[(&str, &str)] = if index == 2 {
                &[("meta", "x")] // never got its written marker
            } else {
                &[("written", "x"), ("meta", "x")]
            };
            writer.put_row(&keys::encode_trx_key(id, index as u32 + 1), columns)?;
        }
    }

    let reader = RocksRowStore::open_read_only(&db_path)?;
    let mut seen: Vec<String> = Vec::new();
    let mut unwritten: Vec<String> = Vec::new();
    for range in trx_row_ranges(8) {
        reader
            .scan_rows(&range, true, &mut |row| {
                let Some((trx_id, _block_num)) = keys::decode_trx_key(&row.key) else {
                    return true;
                };
                seen.push(trx_id.to_string());
                if !row.columns.iter().any(|column| column == "written") {
                    unwritten.push(trx_id.to_string());
                }
                true
            })
            .await?;
    }

    let mut expected: Vec<String> = ids.to_vec();
    expected.sort();
    seen.sort();
    assert_eq!(seen, expected);
    assert_eq!(unwritten, vec![ids[2].clone()]);
    Ok(())
}
