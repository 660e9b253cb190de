// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal host element for unit tests.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;

use hashbrown::HashMap;

use crate::error::BindingError;
use crate::notify::{ChangeNotifier, ElementHooks, LifecycleEvent};
use crate::object::{BindableObject, HostElement, ObjectRef};
use crate::types::{PropertyDef, TypeInfo};
use crate::value::{Value, ValueType};

struct Declared {
    name: String,
    value_type: ValueType,
    writable: bool,
}

/// An element with a bag of dynamically declared properties.
pub(crate) struct Node {
    name: String,
    declared: RefCell<Vec<Declared>>,
    ty: RefCell<Rc<TypeInfo>>,
    values: RefCell<HashMap<String, Value>>,
    reads: RefCell<HashMap<String, usize>>,
    writes: RefCell<HashMap<String, usize>>,
    notifier: ChangeNotifier,
    hooks: ElementHooks,
    children: RefCell<Vec<Rc<Node>>>,
    context: RefCell<Option<ObjectRef>>,
}

impl Node {
    pub(crate) fn new(name: &str) -> Rc<Self> {
        Rc::new(Self {
            name: String::from(name),
            declared: RefCell::new(Vec::new()),
            ty: RefCell::new(TypeInfo::builder(name).build()),
            values: RefCell::new(HashMap::new()),
            reads: RefCell::new(HashMap::new()),
            writes: RefCell::new(HashMap::new()),
            notifier: ChangeNotifier::new(),
            hooks: ElementHooks::new(),
            children: RefCell::new(Vec::new()),
            context: RefCell::new(None),
        })
    }

    pub(crate) fn with_int(self: Rc<Self>, property: &str, value: i32) -> Rc<Self> {
        self.declare(property, ValueType::of::<i32>(), true, Value::new(value))
    }

    pub(crate) fn with_readonly_int(self: Rc<Self>, property: &str, value: i32) -> Rc<Self> {
        self.declare(property, ValueType::of::<i32>(), false, Value::new(value))
    }

    pub(crate) fn with_text(self: Rc<Self>, property: &str, value: &str) -> Rc<Self> {
        self.declare(property, ValueType::of::<String>(), true, Value::from(value))
    }

    pub(crate) fn declare(
        self: Rc<Self>,
        property: &str,
        value_type: ValueType,
        writable: bool,
        initial: Value,
    ) -> Rc<Self> {
        self.declared.borrow_mut().push(Declared {
            name: String::from(property),
            value_type,
            writable,
        });
        self.values
            .borrow_mut()
            .insert(String::from(property), initial);
        let mut builder = TypeInfo::builder(self.name.as_str());
        for declared in self.declared.borrow().iter() {
            let get_name = declared.name.clone();
            let mut def = PropertyDef::dynamic(declared.value_type)
                .with_getter(move |node: &Self| node.read(&get_name));
            if declared.writable {
                let set_name = declared.name.clone();
                def = def.with_setter(move |node: &Self, value| node.set(&set_name, value));
            }
            builder = builder.property(declared.name.as_str(), def);
        }
        *self.ty.borrow_mut() = builder.build();
        self
    }

    pub(crate) fn add_child(&self, child: &Rc<Self>) {
        self.children.borrow_mut().push(child.clone());
    }

    fn read(&self, property: &str) -> Value {
        *self
            .reads
            .borrow_mut()
            .entry(String::from(property))
            .or_default() += 1;
        self.get(property)
    }

    pub(crate) fn get(&self, property: &str) -> Value {
        self.values
            .borrow()
            .get(property)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn set(&self, property: &str, value: Value) -> Result<(), BindingError> {
        *self
            .writes
            .borrow_mut()
            .entry(String::from(property))
            .or_default() += 1;
        self.values
            .borrow_mut()
            .insert(String::from(property), value);
        self.notifier.notify(property)
    }

    pub(crate) fn reads(&self, property: &str) -> usize {
        self.reads.borrow().get(property).copied().unwrap_or(0)
    }

    pub(crate) fn writes(&self, property: &str) -> usize {
        self.writes.borrow().get(property).copied().unwrap_or(0)
    }

    pub(crate) fn notifier_count(&self, property: &str) -> usize {
        self.notifier.subscriber_count(property)
    }

    pub(crate) fn hooks_count(&self) -> usize {
        self.hooks.subscriber_count()
    }

    pub(crate) fn load(&self) -> Result<(), BindingError> {
        self.hooks.raise(&LifecycleEvent::Loaded)
    }

    pub(crate) fn unload(&self) -> Result<(), BindingError> {
        self.hooks.raise(&LifecycleEvent::Unloaded)
    }

    pub(crate) fn set_context(&self, context: Option<ObjectRef>) -> Result<(), BindingError> {
        let old = self.context.replace(context.clone());
        self.hooks
            .raise(&LifecycleEvent::ContextChanged { old, new: context })
    }
}

impl BindableObject for Node {
    fn type_info(&self) -> Rc<TypeInfo> {
        self.ty.borrow().clone()
    }

    fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }
}

impl HostElement for Node {
    fn hooks(&self) -> &ElementHooks {
        &self.hooks
    }

    fn find_name(&self, name: &str) -> Option<ObjectRef> {
        self.children
            .borrow()
            .iter()
            .find(|child| child.name == name)
            .map(|child| {
                let object: ObjectRef = child.clone();
                object
            })
    }

    fn ambient_context(&self) -> Option<ObjectRef> {
        self.context.borrow().clone()
    }
}
