//! In-memory [`HidIo`] replaying queued input reports and recording writes.

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    rc::Rc,
};

use hidapi::{HidError, HidResult};

use crate::HidIo;

#[derive(Default)]
struct Inner {
    inputs: VecDeque<Vec<u8>>,
    writes: Vec<Vec<u8>>,
    features: HashMap<u8, Vec<u8>>,
    feature_reads: Vec<u8>,
    unplugged: bool,
}

/// Cloning shares the queues, so a test can keep a handle on a device it
/// moved into a driver.
#[derive(Clone, Default)]
pub struct FakeHid {
    inner: Rc<RefCell<Inner>>,
}

impl FakeHid {
    pub fn new() -> FakeHid {
        FakeHid::default()
    }

    pub fn push_input(&self, report: &[u8]) {
        self.inner.borrow_mut().inputs.push_back(report.to_vec());
    }

    pub fn set_feature(&self, id: u8, report: &[u8]) {
        self.inner.borrow_mut().features.insert(id, report.to_vec());
    }

    /// Every read and write fails from now on.
    pub fn unplug(&self) {
        self.inner.borrow_mut().unplugged = true;
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.inner.borrow().writes.clone()
    }

    pub fn last_write(&self) -> Option<Vec<u8>> {
        self.inner.borrow().writes.last().cloned()
    }

    pub fn clear_writes(&self) {
        self.inner.borrow_mut().writes.clear();
    }

    /// Ids of the feature reports requested so far.
    pub fn feature_reads(&self) -> Vec<u8> {
        self.inner.borrow().feature_reads.clone()
    }
}

fn unplugged() -> HidError {
    HidError::HidApiError {
        message: "device disconnected".to_string(),
    }
}

impl HidIo for FakeHid {
    fn read_timeout(&self, buf: &mut [u8], _timeout: i32) -> HidResult<usize> {
        let mut inner = self.inner.borrow_mut();
        if inner.unplugged {
            return Err(unplugged());
        }
        match inner.inputs.pop_front() {
            Some(report) => {
                let len = report.len().min(buf.len());
                buf[..len].copy_from_slice(&report[..len]);
                Ok(len)
            }
            None => Ok(0),
        }
    }

    fn write(&self, data: &[u8]) -> HidResult<usize> {
        let mut inner = self.inner.borrow_mut();
        if inner.unplugged {
            return Err(unplugged());
        }
        inner.writes.push(data.to_vec());
        Ok(data.len())
    }

    fn get_feature_report(&self, buf: &mut [u8]) -> HidResult<usize> {
        let mut inner = self.inner.borrow_mut();
        if inner.unplugged {
            return Err(unplugged());
        }
        let id = buf.first().copied().unwrap_or(0);
        inner.feature_reads.push(id);
        match inner.features.get(&id) {
            Some(report) => {
                let len = report.len().min(buf.len());
                buf[..len].copy_from_slice(&report[..len]);
                Ok(len)
            }
            None => Ok(buf.len()),
        }
    }
}
