#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use graphwire::error::BoxError;
use graphwire::{Args, Callable, Signature, Value};

pub fn func<F>(name: &str, params: &[&str], f: F) -> Callable
where
    F: Fn(&Args) -> Result<Value, BoxError> + Send + Sync + 'static,
{
    let signature = params.iter().fold(Signature::new(), |s, p| s.required(*p));
    Callable::new(name, signature, f)
}

/// Sum of the named integer parameters.
pub fn sum(name: &str, params: &[&str]) -> Callable {
    let names: Vec<String> = params.iter().map(|p| p.to_string()).collect();
    func(name, params, move |args| {
        let mut total = 0;
        for n in &names {
            total += args.i64(n)?;
        }
        Ok(Value::from(total))
    })
}

/// Returns its single parameter unchanged.
pub fn pass(name: &str, param: &'static str) -> Callable {
    func(name, &[param], move |args| Ok(args.require(param)?.clone()))
}

#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    pub fn bump(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// A fresh JSON object on every call, counting calls.
pub fn fresh(name: &str, params: &[&str], counter: &Counter) -> Callable {
    let counter = counter.clone();
    func(name, params, move |_| {
        let n = counter.bump();
        Ok(Value::json(serde_json::json!({ "call": n })))
    })
}

/// Constant integer, counting calls.
pub fn counted_const(name: &str, value: i64, counter: &Counter) -> Callable {
    let counter = counter.clone();
    func(name, &[], move |_| {
        counter.bump();
        Ok(Value::from(value))
    })
}

/// Log sink for `tracing_subscriber::fmt().with_writer(..)`.
#[derive(Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    pub fn text(&self) -> String {
        let buf = self.0.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl io::Write for Captured {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
