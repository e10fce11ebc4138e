//! Software model of the 4xx MMU.
//!
//! Translations are kept per address space, keyed by [`PmapId`]. A lookup
//! only succeeds while the [`ContextTable`] still lists the requesting
//! address space as the owner of the context id, the same check the
//! TLB-miss handler makes against the pmap behind the current `PID`.
//! The `PID` register itself is modelled so callers can check that every
//! access hands the MMU back to the kernel context.

use crate::{ContextId, ContextTable, KERNEL_CONTEXT, Mmu, Pmap, PmapId};
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use kernel_memory_addresses::{PAGE_SIZE, UserAddress, UserPage};
use kernel_trap::DataStorageException;

/// Access rights of a mapped page.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Protection {
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("range at {0} wraps past the end of the address space")]
    Overflow(UserAddress),
    #[error("access to unmapped memory at {0}")]
    Unmapped(UserAddress),
}

struct SoftPage {
    bytes: Box<[AtomicU8]>,
    protection: Protection,
}

impl SoftPage {
    fn zeroed(protection: Protection) -> Self {
        Self {
            bytes: (0..PAGE_SIZE).map(|_| AtomicU8::new(0)).collect(),
            protection,
        }
    }

    fn byte(&self, addr: UserAddress) -> &AtomicU8 {
        // `offset()` is always below PAGE_SIZE.
        &self.bytes[addr.offset() as usize]
    }
}

/// Hosted stand-in for the 4xx MMU and its `PID` register.
pub struct SoftMmu<'t> {
    contexts: &'t ContextTable,
    pages: BTreeMap<(PmapId, UserPage), SoftPage>,
    pid: AtomicU8,
    cpu: AtomicBool,
    flushes: AtomicUsize,
    accesses: AtomicUsize,
}

impl<'t> SoftMmu<'t> {
    #[must_use]
    pub const fn new(contexts: &'t ContextTable) -> Self {
        Self {
            contexts,
            pages: BTreeMap::new(),
            pid: AtomicU8::new(KERNEL_CONTEXT),
            cpu: AtomicBool::new(false),
            flushes: AtomicUsize::new(0),
            accesses: AtomicUsize::new(0),
        }
    }

    /// Map zeroed pages covering `[base, base + len)` into `pmap`.
    ///
    /// Pages already mapped keep their contents and protection.
    ///
    /// # Errors
    /// Fails if the range runs past the top of the address space.
    pub fn map(
        &mut self,
        pmap: &Pmap,
        base: UserAddress,
        len: u32,
        protection: Protection,
    ) -> Result<(), MapError> {
        if len > 0 && base.checked_add(len - 1).is_none() {
            return Err(MapError::Overflow(base));
        }
        for page in UserPage::range_covering(base, len) {
            self.pages
                .entry((pmap.id(), page))
                .or_insert_with(|| SoftPage::zeroed(protection));
        }
        Ok(())
    }

    /// Map pages for `data` at `base` and fill them with it.
    ///
    /// # Errors
    /// See [`map`](Self::map).
    pub fn map_bytes(
        &mut self,
        pmap: &Pmap,
        base: UserAddress,
        data: &[u8],
        protection: Protection,
    ) -> Result<(), MapError> {
        let len = u32::try_from(data.len()).map_err(|_| MapError::Overflow(base))?;
        self.map(pmap, base, len, protection)?;
        self.poke(pmap, base, data)
    }

    /// Remove the page containing `addr` from `pmap`.
    pub fn unmap(&mut self, pmap: &Pmap, addr: UserAddress) -> bool {
        self.pages.remove(&(pmap.id(), addr.page())).is_some()
    }

    /// Write `data` at `base` from the kernel side, ignoring protection.
    ///
    /// # Errors
    /// Fails on the first unmapped byte; earlier bytes stay written.
    pub fn poke(&self, pmap: &Pmap, base: UserAddress, data: &[u8]) -> Result<(), MapError> {
        let mut addr = base;
        for &b in data {
            self.page(pmap.id(), addr)
                .ok_or(MapError::Unmapped(addr))?
                .byte(addr)
                .store(b, Ordering::Relaxed);
            addr = addr.wrapping_add(1);
        }
        Ok(())
    }

    /// Read `len` bytes at `base` from the kernel side.
    ///
    /// # Errors
    /// Fails if any byte in the range is unmapped.
    pub fn peek(&self, pmap: &Pmap, base: UserAddress, len: usize) -> Result<Vec<u8>, MapError> {
        let mut out = Vec::with_capacity(len);
        let mut addr = base;
        for _ in 0..len {
            let page = self.page(pmap.id(), addr).ok_or(MapError::Unmapped(addr))?;
            out.push(page.byte(addr).load(Ordering::Relaxed));
            addr = addr.wrapping_add(1);
        }
        Ok(out)
    }

    /// Current value of the modelled `PID` register.
    #[must_use]
    pub fn active_pid(&self) -> u8 {
        self.pid.load(Ordering::Relaxed)
    }

    /// Number of [`Mmu::flush_context`] calls so far.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::Relaxed)
    }

    /// Number of user accesses performed through the [`Mmu`] interface.
    #[must_use]
    pub fn access_count(&self) -> usize {
        self.accesses.load(Ordering::Relaxed)
    }

    fn page(&self, pmap: PmapId, addr: UserAddress) -> Option<&SoftPage> {
        self.pages.get(&(pmap, addr.page()))
    }

    /// Run `access` with `PID` switched to `ctx`, then switch back.
    ///
    /// The model is a single CPU: accesses from different host threads take
    /// turns, so each one restores the `PID` it found.
    fn with_context<R>(&self, ctx: ContextId, access: impl FnOnce() -> R) -> R {
        while self
            .cpu
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            core::hint::spin_loop();
        }
        let saved = self.pid.swap(ctx.get(), Ordering::Relaxed);
        self.accesses.fetch_add(1, Ordering::Relaxed);
        let result = access();
        self.pid.store(saved, Ordering::Relaxed);
        self.cpu.store(false, Ordering::Release);
        result
    }

    /// Resolve `addr` of `space` under `ctx`.
    ///
    /// Misses when `ctx` no longer belongs to `space`, as the TLB does once a
    /// stolen context has been flushed.
    fn translate(
        &self,
        ctx: ContextId,
        space: PmapId,
        addr: UserAddress,
        store: bool,
    ) -> Result<&SoftPage, DataStorageException> {
        let page = Some(space)
            .filter(|&space| self.contexts.is_owned_by(ctx, space))
            .and_then(|space| self.page(space, addr))
            .ok_or_else(|| DataStorageException::tlb_miss(addr, store))?;
        if store && page.protection == Protection::ReadOnly {
            return Err(DataStorageException::protection(addr, store));
        }
        Ok(page)
    }
}

impl Mmu for SoftMmu<'_> {
    fn fetch_byte(
        &self,
        ctx: ContextId,
        space: PmapId,
        addr: UserAddress,
    ) -> Result<u8, DataStorageException> {
        self.with_context(ctx, || {
            let page = self.translate(ctx, space, addr, false)?;
            Ok(page.byte(addr).load(Ordering::Relaxed))
        })
    }

    fn store_byte(
        &self,
        ctx: ContextId,
        space: PmapId,
        addr: UserAddress,
        value: u8,
    ) -> Result<(), DataStorageException> {
        self.with_context(ctx, || {
            let page = self.translate(ctx, space, addr, true)?;
            page.byte(addr).store(value, Ordering::Relaxed);
            Ok(())
        })
    }

    fn flush_context(&self, ctx: ContextId) {
        log::trace!("flushing TLB entries of context {ctx}");
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }
}
