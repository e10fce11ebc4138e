use kernel_memory_addresses::UserAddress;
use kernel_mmu::{ContextId, ContextTable, Mmu, Pmap, PmapId, USER_CONTEXTS};
use kernel_trap::DataStorageException;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

/// MMU that only records flushes; user accesses always miss.
#[derive(Default)]
struct FlushRecorder {
    flushed: Mutex<Vec<u8>>,
    calls: AtomicUsize,
}

impl Mmu for FlushRecorder {
    fn fetch_byte(
        &self,
        _ctx: ContextId,
        _space: PmapId,
        addr: UserAddress,
    ) -> Result<u8, DataStorageException> {
        Err(DataStorageException::tlb_miss(addr, false))
    }

    fn store_byte(
        &self,
        _ctx: ContextId,
        _space: PmapId,
        addr: UserAddress,
        _value: u8,
    ) -> Result<(), DataStorageException> {
        Err(DataStorageException::tlb_miss(addr, true))
    }

    fn flush_context(&self, ctx: ContextId) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.flushed.lock().unwrap().push(ctx.get());
    }
}

#[test]
fn first_use_allocates_and_later_uses_reuse() {
    let table = ContextTable::new();
    let mmu = FlushRecorder::default();
    let pmap = Pmap::new();

    assert_eq!(pmap.cached_context(), None);
    let ctx = pmap.context(&table, &mmu);
    assert_eq!(pmap.cached_context(), Some(ctx));
    assert_eq!(table.owner(ctx), Some(pmap.id()));

    // idempotent
    assert_eq!(pmap.context(&table, &mmu), ctx);
    assert_eq!(table.in_use(), 1);
    assert_eq!(mmu.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn distinct_pmaps_get_distinct_ids() {
    let table = ContextTable::new();
    let mmu = FlushRecorder::default();
    let a = Pmap::new();
    let b = Pmap::new();
    assert_ne!(a.context(&table, &mmu), b.context(&table, &mmu));
    assert_eq!(table.in_use(), 2);
}

#[test]
fn release_frees_the_id() {
    let table = ContextTable::new();
    let mmu = FlushRecorder::default();
    let pmap = Pmap::new();
    let ctx = pmap.context(&table, &mmu);

    pmap.release(&table);
    assert_eq!(pmap.cached_context(), None);
    assert_eq!(table.owner(ctx), None);
    assert_eq!(table.in_use(), 0);
}

#[test]
fn exhausted_table_steals_and_flushes() {
    let table = ContextTable::new();
    let mmu = FlushRecorder::default();
    let pmaps: Vec<Pmap> = (0..USER_CONTEXTS).map(|_| Pmap::new()).collect();
    for p in &pmaps {
        let _ = p.context(&table, &mmu);
    }
    assert_eq!(table.in_use(), USER_CONTEXTS);
    assert_eq!(mmu.calls.load(Ordering::SeqCst), 0);

    let late = Pmap::new();
    let stolen = late.context(&table, &mmu);
    assert_eq!(table.owner(stolen), Some(late.id()));
    assert_eq!(*mmu.flushed.lock().unwrap(), [stolen.get()]);

    // The victim notices on its next use and takes another id.
    let victim = pmaps
        .iter()
        .find(|p| p.cached_context() == Some(stolen))
        .expect("some pmap held the stolen id");
    let replacement = victim.context(&table, &mmu);
    assert_ne!(replacement, stolen);
    assert_eq!(table.owner(replacement), Some(victim.id()));
    assert_eq!(mmu.calls.load(Ordering::SeqCst), 2);

    // The thief keeps its id.
    assert_eq!(late.context(&table, &mmu), stolen);
}

#[test]
fn racing_threads_of_one_pmap_agree_on_one_id() {
    let threads = 8;
    let table = Arc::new(ContextTable::new());
    let mmu = Arc::new(FlushRecorder::default());
    let pmap = Arc::new(Pmap::new());
    let start = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let (table, mmu, pmap, start) = (
                Arc::clone(&table),
                Arc::clone(&mmu),
                Arc::clone(&pmap),
                Arc::clone(&start),
            );
            thread::spawn(move || {
                start.wait();
                pmap.context(&*table, &*mmu)
            })
        })
        .collect();

    let ids: Vec<ContextId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(ids.iter().all(|&id| id == ids[0]), "ids diverged: {ids:?}");
    assert_eq!(table.in_use(), 1);
    assert_eq!(table.owner(ids[0]), Some(pmap.id()));
}

#[test]
fn racing_pmaps_never_share_an_id() {
    let threads = 8;
    let table = Arc::new(ContextTable::new());
    let mmu = Arc::new(FlushRecorder::default());
    let start = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let (table, mmu, start) = (Arc::clone(&table), Arc::clone(&mmu), Arc::clone(&start));
            thread::spawn(move || {
                let pmap = Pmap::new();
                start.wait();
                let ctx = pmap.context(&*table, &*mmu);
                (ctx, pmap.id())
            })
        })
        .collect();

    let mut ids: Vec<u8> = handles
        .into_iter()
        .map(|h| {
            let (ctx, owner) = h.join().unwrap();
            assert_eq!(table.owner(ctx), Some(owner));
            ctx.get()
        })
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), threads);
}

#[test]
fn racing_threads_of_one_pmap_steal_only_once() {
    let threads = 8;
    let table = Arc::new(ContextTable::new());
    let mmu = Arc::new(FlushRecorder::default());
    let residents: Arc<Vec<Pmap>> = Arc::new((0..USER_CONTEXTS).map(|_| Pmap::new()).collect());
    for p in residents.iter() {
        let _ = p.context(&*table, &*mmu);
    }
    assert_eq!(table.in_use(), USER_CONTEXTS);

    let late = Arc::new(Pmap::new());
    let start = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let (table, mmu, late, start) = (
                Arc::clone(&table),
                Arc::clone(&mmu),
                Arc::clone(&late),
                Arc::clone(&start),
            );
            thread::spawn(move || {
                start.wait();
                late.context(&*table, &*mmu)
            })
        })
        .collect();

    let ids: Vec<ContextId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(ids.iter().all(|&id| id == ids[0]), "ids diverged: {ids:?}");
    assert_eq!(table.owner(ids[0]), Some(late.id()));

    // exactly one resident lost its id, and only that id was flushed
    assert_eq!(*mmu.flushed.lock().unwrap(), [ids[0].get()]);
    let still_owning = residents
        .iter()
        .filter(|p| {
            p.cached_context()
                .is_some_and(|ctx| table.is_owned_by(ctx, p.id()))
        })
        .count();
    assert_eq!(still_owning, USER_CONTEXTS - 1);
}
