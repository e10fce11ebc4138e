use bitfield_struct::bitfield;
use kernel_memory_addresses::UserAddress;

/// Exception Syndrome Register (ESR) layout of the 4xx cores.
///
/// The manuals number bits MSB-first; the comments below give both the
/// manual's bit number and the LSB-first position used here.
#[bitfield(u32, order = Lsb)]
#[derive(Eq, PartialEq)]
pub struct Esr {
    #[bits(16)]
    _res0: u16,

    /// ESR\[15\], bit 16 — U0F: user-defined storage attribute fault.
    pub u0f: bool,

    #[bits(5)]
    _res1: u8,

    /// ESR\[9\], bit 22 — DIZ: data access hit a zone protection violation.
    pub diz: bool,

    /// ESR\[8\], bit 23 — DST: the faulting access was a store.
    pub dst: bool,

    _res2: bool,

    /// ESR\[6\], bit 25 — PTR: program exception caused by a trap instruction.
    pub ptr: bool,

    /// ESR\[5\], bit 26 — PPR: privileged instruction in problem state.
    pub ppr: bool,

    /// ESR\[4\], bit 27 — PIL: illegal instruction.
    pub pil: bool,

    #[bits(3)]
    _res3: u8,

    /// ESR\[0\], bit 31 — MCI: instruction machine check.
    pub mci: bool,
}

impl Esr {
    #[must_use]
    pub const fn is_store(&self) -> bool {
        self.dst()
    }
}

/// How the MMU refused a data access.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FaultKind {
    /// No TLB entry could be loaded for the address in the active context.
    TlbMiss,
    /// A translation exists but its protection bits forbid the access.
    Protection,
}

/// A data-side exception raised by a supervisor access to user memory.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DataStorageException {
    /// Data Exception Address Register: the effective address that faulted.
    pub address: UserAddress,
    pub syndrome: Esr,
    pub kind: FaultKind,
}

impl DataStorageException {
    #[must_use]
    pub const fn tlb_miss(address: UserAddress, store: bool) -> Self {
        Self {
            address,
            syndrome: Esr::new().with_dst(store),
            kind: FaultKind::TlbMiss,
        }
    }

    #[must_use]
    pub const fn protection(address: UserAddress, store: bool) -> Self {
        Self {
            address,
            syndrome: Esr::new().with_dst(store),
            kind: FaultKind::Protection,
        }
    }

    #[must_use]
    pub const fn explain(&self) -> &'static str {
        match (self.kind, self.syndrome.is_store()) {
            (FaultKind::TlbMiss, false) => "Load from unmapped user page",
            (FaultKind::TlbMiss, true) => "Store to unmapped user page",
            (FaultKind::Protection, false) => "Load from protected user page",
            (FaultKind::Protection, true) => "Store to read-only user page",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dst_is_manual_bit_8() {
        assert_eq!(Esr::new().with_dst(true).into_bits(), 0x0080_0000);
        assert_eq!(Esr::new().with_diz(true).into_bits(), 0x0040_0000);
        assert_eq!(Esr::new().with_mci(true).into_bits(), 0x8000_0000);
        assert_eq!(Esr::new().with_pil(true).into_bits(), 0x0800_0000);
    }

    #[test]
    fn explain_distinguishes_store() {
        let ua = UserAddress::new(0x10);
        assert_eq!(
            DataStorageException::protection(ua, true).explain(),
            "Store to read-only user page"
        );
        assert_eq!(
            DataStorageException::tlb_miss(ua, false).explain(),
            "Load from unmapped user page"
        );
    }
}
