//! Per-key state: the producer's coordinator plus the currently in-flight
//! transaction, if any.

use std::any::Any;
use std::rc::Rc;

use crate::transaction::Transaction;

pub(crate) struct StateEntry {
    pub coordinator: Box<dyn Any>,
    pub transaction: Option<Rc<Transaction>>,
}
