use kernel_memory_addresses::UserAddress;
use kernel_trap::{DataStorageException, Errno, Pcb, deliver_data_storage};
use std::panic;

fn miss() -> DataStorageException {
    DataStorageException::tlb_miss(UserAddress::new(0xDEAD_0000), false)
}

#[test]
fn guard_arms_and_clears() {
    let pcb = Pcb::new();
    assert!(!pcb.is_armed());
    {
        let guard = pcb.set_fault(Errno::EFAULT);
        assert!(pcb.is_armed());
        assert_eq!(guard.fault_buf().errno(), Errno::EFAULT);
    }
    assert!(!pcb.is_armed());
}

#[test]
fn guard_records_arming_site() {
    let pcb = Pcb::new();
    let line = line!() + 1;
    let guard = pcb.set_fault(Errno::EFAULT);
    let site = guard.fault_buf().site();
    assert_eq!(site.line(), line);
    assert!(site.file().ends_with("fault_guard.rs"));
}

#[test]
fn nested_guard_restores_outer_point() {
    let pcb = Pcb::new();
    let outer = pcb.set_fault(Errno::EFAULT);
    {
        let _inner = pcb.set_fault(Errno::ENAMETOOLONG);
        assert_eq!(deliver_data_storage(&pcb, &miss()), Errno::ENAMETOOLONG);
    }
    assert_eq!(deliver_data_storage(&pcb, &miss()), Errno::EFAULT);
    drop(outer);
    assert!(!pcb.is_armed());
}

#[test]
fn armed_fault_is_recovered_and_counted() {
    let pcb = Pcb::new();
    let _guard = pcb.set_fault(Errno::EFAULT);
    assert_eq!(deliver_data_storage(&pcb, &miss()), Errno::EFAULT);
    assert_eq!(deliver_data_storage(&pcb, &miss()), Errno::EFAULT);
    assert_eq!(pcb.recovered_faults(), 2);
}

#[test]
#[should_panic(expected = "fatal kernel data storage fault")]
fn unarmed_fault_is_fatal() {
    let pcb = Pcb::new();
    let _ = deliver_data_storage(&pcb, &miss());
}

#[test]
fn guard_is_cleared_when_unwinding() {
    let pcb = Pcb::new();
    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        let _guard = pcb.set_fault(Errno::EFAULT);
        panic!("boom");
    }));
    assert!(res.is_err(), "expected panic");
    assert!(!pcb.is_armed());
}

#[test]
fn errno_formats_by_name() {
    assert_eq!(format!("{}", Errno::EFAULT), "EFAULT");
    assert_eq!(format!("{:?}", Errno::ENAMETOOLONG), "ENAMETOOLONG(63)");
    assert_eq!(format!("{}", Errno::from_raw(5)), "errno 5");
}
