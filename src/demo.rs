//! Bundled demo: a handful of instrumented functions covering immutable and
//! mutable locals, attribute and index access, numeric arrays, and ignore
//! markers.
//!
//! Probes sit at the start of the line whose code they precede, which is why
//! these functions opt out of rustfmt.

use anyhow::Result;
use std::collections::BTreeMap;
use tracing::info;
use ztrace::{Frame, NdArray, Session, Sink, ToValue, Value, step};

#[rustfmt::skip]
fn trace_basic_immutable_data(frame: &Frame, t: i64) {
    step!(frame; t);                    let mut res = 0;
    for i in 0..t {
        step!(frame; t, res);           res += i;
    }
    step!(frame; t, res);               res *= 2;
    step!(frame; t, res);               let mut res = String::new();
    for i in 0..t {
        step!(frame; t, res);           res.push_str(&i.to_string());
    }
    step!(frame; t, res);               res = res.repeat(2);
    step!(frame; t, res);
}

#[rustfmt::skip]
fn trace_basic_mutable_data(frame: &Frame, t: i64) {
    step!(frame; t);                    let mut arr: Vec<i64> = Vec::new();
    step!(frame; arr);                  let mut obj: BTreeMap<String, i64> = BTreeMap::new();
    for i in 0..t {
        step!(frame; arr, obj);         arr.push(i);
        step!(frame; arr, obj);         obj.insert(i.to_string(), i);
    }
    step!(frame; arr, obj);
}

struct Cls {
    a: Option<usize>,
}

impl ToValue for Cls {
    fn to_value(&self) -> Value {
        Value::object("Cls", [("a", self.a.to_value())])
    }
}

type Nested = BTreeMap<String, BTreeMap<String, Option<usize>>>;

#[rustfmt::skip]
fn trace_attr(frame: &Frame, t: usize) {
    step!(frame);                       let mut arr: Vec<Option<usize>> = vec![None; t.max(2)];
    step!(frame; arr);                  let mut obj: Nested = BTreeMap::from([("a".to_string(), BTreeMap::from([("b".to_string(), None)]))]);
    step!(frame; arr, obj);             let mut cls = Cls { a: None };
    for i in 0..t {
        step!(frame; arr, obj, cls);    arr[1] = Some(i);
        step!(frame; arr, obj, cls);    if let Some(a) = obj.get_mut("a") { a.insert("b".to_string(), Some(i)); }
        step!(frame; arr, obj, cls);    cls.a = Some(i);
    }
    step!(frame; arr, obj, cls);
}

#[rustfmt::skip]
fn trace_special_array(frame: &Frame, t: usize) {
    step!(frame);                       let mut arr = NdArray::zeros(vec![t]);
    step!(frame; arr);                  let mut tensor = NdArray::zeros(vec![t]).as_tensor();
    for i in 0..t {
        step!(frame; arr, tensor);      if let Some(x) = arr.get_mut(i) { *x = i as f64; }
        step!(frame; arr, tensor);      if let Some(x) = tensor.get_mut(i) { *x = i as f64; }
    }
    step!(frame; arr, tensor);          let tensor = tensor.concat(&arr).unwrap_or(tensor);
    step!(frame; arr, tensor);
}

#[rustfmt::skip]
fn trace_with_ignoring(frame: &Frame, t: i64) {
    step!(frame; t);                    let mut res = 0;
    for i in 0..t {
        step!(frame; t, res);           res += i; // ztrace: ignore
    }
    step!(frame; t, res);               res *= 2;
    step!(frame; t, res);               let mut res = String::new(); // ztrace: ignore
    for i in 0..t {
        step!(frame; t, res);           res.push_str(&i.to_string());
    }
    step!(frame; t, res);               res = res.repeat(2);
    step!(frame; t, res);
}

/// Run every demo function against `session`.
pub fn run<S: Sink>(session: &Session<S>) -> Result<()> {
    let basic = session.trace(["t", "res"])?.wrap(trace_basic_immutable_data);
    for _ in 0..3 {
        basic.try_call(3)?;
    }
    session
        .trace(["arr", "obj"])?
        .wrap(trace_basic_mutable_data)
        .try_call(3)?;
    session
        .trace(["arr[1]", r#"obj["a"]["b"]"#, "cls.a"])?
        .wrap(trace_attr)
        .try_call(3)?;
    session
        .trace(["arr", "arr[1]", "tensor", "tensor[1]"])?
        .wrap(trace_special_array)
        .try_call(3)?;
    session
        .trace(["t", "res"])?
        .wrap(trace_with_ignoring)
        .try_call(3)?;

    info!("demo functions traced");
    Ok(())
}
