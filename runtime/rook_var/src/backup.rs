//! Cell payload backup for recursive function calls.
//!
//! A recursive call must see its locals fresh while the outer activation's
//! values wait intact. Backing up moves the whole payload out of the live
//! cell and leaves it blank, heap-tagged, and marked uninitialized; restore
//! moves the payload back and discards whatever the inner activation left.

use smallvec::SmallVec;

use crate::arena::{VarArena, VarId};
use crate::attrib::VarAttrib;
use crate::buffer::FreeMode;
use crate::cell::Repr;

/// Everything address-independent about one cell: payload, attributes, and
/// alias linkage.
pub struct VarBkp {
    var: VarId,
    repr: Repr,
    alias_for: Option<VarId>,
    attrib: VarAttrib,
}

impl VarBkp {
    pub fn var(&self) -> VarId {
        self.var
    }
}

/// Most functions have few locals; the common case stays off the heap.
pub type VarBackupList = SmallVec<[VarBkp; 8]>;

/// The variable lists of one function, as the scope layer stores them.
pub struct FuncVars<'a> {
    pub vars: &'a [VarId],
    pub lazy_vars: &'a [VarId],
}

impl VarArena {
    /// Move the cell's payload into a backup and reset the live cell.
    ///
    /// The live cell becomes blank with heap-tagged empty storage, so the
    /// small-growth tiers are not re-entered by the inner activation. Alias
    /// linkage stays on the live cell: a by-reference parameter remains
    /// bound to its caller's cell until the inner call re-binds it.
    pub fn backup(&mut self, id: VarId) -> VarBkp {
        let cell = self.cell_mut(id);
        debug_assert!(!cell.attrib.contains(VarAttrib::STATIC));
        let repr = std::mem::replace(&mut cell.repr, Repr::empty_heap());
        let bkp = VarBkp {
            var: id,
            repr,
            alias_for: cell.alias_for,
            attrib: cell.attrib,
        };
        cell.attrib = VarAttrib::UNINITIALIZED;
        bkp
    }

    /// Put a backed-up payload back, byte for byte. Whatever the inner
    /// activation left behind is released, after the restore is in place.
    pub fn restore(&mut self, bkp: VarBkp) {
        let cell = self.cell_mut(bkp.var);
        let discarded = std::mem::replace(&mut cell.repr, bkp.repr);
        cell.alias_for = bkp.alias_for;
        cell.attrib = bkp.attrib;
        drop(discarded);
    }

    /// Back up every non-static variable of a function, eager then lazy.
    /// An empty list is the normal result for a function with only statics.
    pub fn backup_function_vars(&mut self, func: &FuncVars) -> VarBackupList {
        let mut list = VarBackupList::new();
        for &var in func.vars.iter().chain(func.lazy_vars.iter()) {
            if !self.is_static(var) {
                list.push(self.backup(var));
            }
        }
        tracing::debug!(count = list.len(), "backed up function variables");
        list
    }

    /// End-of-call cleanup: blank the current activation's variables
    /// (statics keep their values, aliases are skipped), then restore the
    /// outer activation's payloads.
    pub fn free_and_restore_function_vars(&mut self, func: &FuncVars, backup: VarBackupList) {
        for &var in func.vars.iter().chain(func.lazy_vars.iter()) {
            self.free(var, FreeMode::AlwaysExcludeStatic, true);
        }
        for bkp in backup {
            self.restore(bkp);
        }
    }
}
