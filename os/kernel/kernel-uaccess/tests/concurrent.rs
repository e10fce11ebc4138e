use kernel_memory_addresses::UserAddress;
use kernel_mmu::{ContextTable, KERNEL_CONTEXT, Pmap, Protection, SoftMmu};
use kernel_trap::Pcb;
use kernel_uaccess::UserAccess;
use std::sync::Barrier;
use std::thread;

#[test]
fn threads_of_one_process_copy_concurrently() {
    let threads = 8;
    let iters = 200;
    let base = UserAddress::new(0x3000_0000);

    let table = ContextTable::new();
    let pmap = Pmap::new();
    let mut mmu = SoftMmu::new(&table);
    mmu.map_bytes(&pmap, base, b"/usr/bin/env\0", Protection::ReadOnly)
        .unwrap();
    let start = Barrier::new(threads);

    thread::scope(|s| {
        for _ in 0..threads {
            s.spawn(|| {
                // every kernel thread has its own PCB
                let pcb = Pcb::new();
                let ua = UserAccess::new(&mmu, &table, &pmap, &pcb);
                start.wait();
                for _ in 0..iters {
                    let mut dst = [0_u8; 32];
                    assert_eq!(ua.copyinstr(base, &mut dst), Ok(13));
                    assert_eq!(&dst[..13], b"/usr/bin/env\0");
                    assert!(!pcb.is_armed());
                }
            });
        }
    });

    assert_eq!(table.in_use(), 1);
    assert!(pmap.cached_context().is_some());
    assert_eq!(mmu.active_pid(), KERNEL_CONTEXT);
    assert_eq!(mmu.access_count(), threads * iters * 13);
}
