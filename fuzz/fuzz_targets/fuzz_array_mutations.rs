#![no_main]

use std::cell::RefCell;
use std::rc::Rc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use reactive_array::{ReactiveArray, replay};

#[derive(Arbitrary, Debug)]
enum FuzzCall {
    Append(u8),
    AppendContentsOf(Vec<u8>),
    Insert { value: u8, index: u8 },
    Replace { value: u8, index: u8 },
    RemoveAt(u8),
    ReplaceAll(Vec<u8>),
    RemoveAll(bool),
    Get(u8),
    /// Attach a late replay subscriber.
    Subscribe,
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    seed: Vec<u8>,
    calls: Vec<FuzzCall>,
}

fuzz_target!(|input: FuzzInput| {
    let array = ReactiveArray::from(input.seed);
    let mirror = array.mirror(|v| u16::from(*v) + 1);
    let count = array.observable_count();
    let mut model = array.snapshot();

    let mut logs = Vec::new();
    let mut subs = Vec::new();

    for call in input.calls.into_iter().take(512) {
        match call {
            FuzzCall::Append(v) => {
                array.append(v);
                model.push(v);
            }
            FuzzCall::AppendContentsOf(vs) => {
                model.extend_from_slice(&vs);
                array.append_contents_of(vs);
            }
            FuzzCall::Insert { value, index } => {
                let index = usize::from(index);
                let ok = array.try_insert(value, index).is_ok();
                assert_eq!(ok, index <= model.len());
                if ok {
                    model.insert(index, value);
                }
            }
            FuzzCall::Replace { value, index } => {
                let index = usize::from(index);
                match array.try_replace(value, index) {
                    Ok(old) => assert_eq!(old, std::mem::replace(&mut model[index], value)),
                    Err(_) => assert!(index >= model.len()),
                }
            }
            FuzzCall::RemoveAt(index) => {
                let index = usize::from(index);
                match array.try_remove_at_index(index) {
                    Ok(old) => assert_eq!(old, model.remove(index)),
                    Err(_) => assert!(index >= model.len()),
                }
            }
            FuzzCall::ReplaceAll(vs) => {
                model.clone_from(&vs);
                array.replace_all(vs);
            }
            FuzzCall::RemoveAll(keep) => {
                array.remove_all(keep);
                model.clear();
            }
            FuzzCall::Get(index) => {
                let index = usize::from(index);
                assert_eq!(array.try_get(index).ok(), model.get(index).copied());
            }
            FuzzCall::Subscribe => {
                let log = Rc::new(RefCell::new(Vec::new()));
                let sink = Rc::clone(&log);
                subs.push(array.subscribe_replay(move |op| sink.borrow_mut().push(op.clone())));
                logs.push(log);
            }
        }

        assert_eq!(array.snapshot(), model);
        assert_eq!(count.get(), model.len());
        assert_eq!(mirror.count(), model.len());
    }

    let expected: Vec<u16> = model.iter().map(|v| u16::from(*v) + 1).collect();
    assert_eq!(mirror.snapshot(), expected);
    for log in &logs {
        assert_eq!(replay(log.borrow().iter()).ok(), Some(model.clone()));
    }
});
