// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A small element tree host shared by the integration tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]
#![allow(unreachable_pub, reason = "shared between test binaries")]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use understory_binding::{
    BindableObject, BindingError, ChangeNotifier, ElementHooks, ElementRef, FnConverter,
    HostElement, LifecycleEvent, ObjectRef, PropertyDef, TypeInfo, Value, ValueType, Visibility,
};

/// Plain data object used as an explicit source or an ambient context.
pub struct Person {
    pub first: RefCell<String>,
    pub last: RefCell<String>,
    pub age: Cell<i32>,
    pub nickname: RefCell<Option<String>>,
    pub tag: Cell<i32>,
    pub reads: Cell<usize>,
    pub writes: Cell<usize>,
    notifier: ChangeNotifier,
}

impl Person {
    pub fn new(first: &str, last: &str, age: i32) -> Rc<Self> {
        Rc::new(Self {
            first: RefCell::new(first.into()),
            last: RefCell::new(last.into()),
            age: Cell::new(age),
            nickname: RefCell::new(None),
            tag: Cell::new(0),
            reads: Cell::new(0),
            writes: Cell::new(0),
            notifier: ChangeNotifier::new(),
        })
    }

    pub fn object(self: &Rc<Self>) -> ObjectRef {
        self.clone()
    }

    fn read<T>(&self, value: T) -> T {
        self.reads.set(self.reads.get() + 1);
        value
    }

    fn changed(&self, property: &str) -> Result<(), BindingError> {
        self.writes.set(self.writes.get() + 1);
        self.notifier.notify(property)
    }

    pub fn set_first(&self, first: String) -> Result<(), BindingError> {
        *self.first.borrow_mut() = first;
        self.changed("FirstName")
    }

    pub fn set_last(&self, last: String) -> Result<(), BindingError> {
        *self.last.borrow_mut() = last;
        self.changed("LastName")
    }

    pub fn set_age(&self, age: i32) -> Result<(), BindingError> {
        self.age.set(age);
        self.changed("Age")
    }

    pub fn set_nickname(&self, nickname: Option<String>) -> Result<(), BindingError> {
        *self.nickname.borrow_mut() = nickname;
        self.changed("Nickname")
    }

    pub fn observers(&self, property: &str) -> usize {
        self.notifier.subscriber_count(property)
    }
}

thread_local! {
    static PERSON_TYPE: Rc<TypeInfo> = TypeInfo::builder("Person")
        .property(
            "FirstName",
            PropertyDef::read_write(|p: &Person| p.read(p.first.borrow().clone()), Person::set_first),
        )
        .property(
            "LastName",
            PropertyDef::read_write(|p: &Person| p.read(p.last.borrow().clone()), Person::set_last),
        )
        .property(
            "Age",
            PropertyDef::read_write(|p: &Person| p.read(p.age.get()), Person::set_age),
        )
        .property(
            "Nickname",
            PropertyDef::nullable(
                |p: &Person| p.read(p.nickname.borrow().clone()),
                Person::set_nickname,
            ),
        )
        .property(
            "Initials",
            PropertyDef::read_only(|p: &Person| {
                let first = p.first.borrow().chars().next().unwrap_or(' ');
                let last = p.last.borrow().chars().next().unwrap_or(' ');
                p.read(format!("{first}{last}"))
            }),
        )
        .attached(
            "Tag",
            |p: &Person| p.read(p.tag.get()),
            |p: &Person, tag: i32| {
                p.tag.set(tag);
                p.changed("Tag")
            },
        )
        .build();
}

impl BindableObject for Person {
    fn type_info(&self) -> Rc<TypeInfo> {
        PERSON_TYPE.with(Rc::clone)
    }

    fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }
}

/// A UI element with a handful of typed properties.
pub struct Element {
    pub name: String,
    pub text: RefCell<String>,
    pub width: Cell<f64>,
    pub height: Cell<f64>,
    pub count: Cell<i32>,
    pub secret: Cell<i32>,
    pub text_writes: Cell<usize>,
    pub count_writes: Cell<usize>,
    children: RefCell<Vec<Rc<Element>>>,
    context: RefCell<Option<ObjectRef>>,
    notifier: ChangeNotifier,
    hooks: ElementHooks,
}

impl Element {
    pub fn new(name: &str) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            text: RefCell::new(String::new()),
            width: Cell::new(0.0),
            height: Cell::new(0.0),
            count: Cell::new(0),
            secret: Cell::new(0),
            text_writes: Cell::new(0),
            count_writes: Cell::new(0),
            children: RefCell::new(Vec::new()),
            context: RefCell::new(None),
            notifier: ChangeNotifier::new(),
            hooks: ElementHooks::new(),
        })
    }

    pub fn with_child(self: Rc<Self>, child: &Rc<Self>) -> Rc<Self> {
        self.children.borrow_mut().push(child.clone());
        self
    }

    pub fn element(self: &Rc<Self>) -> ElementRef {
        self.clone()
    }

    pub fn object(self: &Rc<Self>) -> ObjectRef {
        self.clone()
    }

    pub fn text(&self) -> String {
        self.text.borrow().clone()
    }

    pub fn set_text(&self, text: String) -> Result<(), BindingError> {
        *self.text.borrow_mut() = text;
        self.text_writes.set(self.text_writes.get() + 1);
        self.notifier.notify("Text")
    }

    pub fn set_width(&self, width: f64) -> Result<(), BindingError> {
        self.width.set(width);
        self.notifier.notify("Width")
    }

    pub fn set_height(&self, height: f64) -> Result<(), BindingError> {
        self.height.set(height);
        self.notifier.notify("Height")
    }

    pub fn set_count(&self, count: i32) -> Result<(), BindingError> {
        self.count.set(count);
        self.count_writes.set(self.count_writes.get() + 1);
        self.notifier.notify("Count")
    }

    fn set_secret(&self, secret: i32) -> Result<(), BindingError> {
        self.secret.set(secret);
        self.notifier.notify("Secret")
    }

    pub fn observers(&self, property: &str) -> usize {
        self.notifier.subscriber_count(property)
    }

    pub fn lifecycle_observers(&self) -> usize {
        self.hooks.subscriber_count()
    }

    pub fn load(&self) -> Result<(), BindingError> {
        self.hooks.raise(&LifecycleEvent::Loaded)
    }

    pub fn unload(&self) -> Result<(), BindingError> {
        self.hooks.raise(&LifecycleEvent::Unloaded)
    }

    pub fn set_context(&self, context: Option<ObjectRef>) -> Result<(), BindingError> {
        let old = self.context.replace(context.clone());
        self.hooks
            .raise(&LifecycleEvent::ContextChanged { old, new: context })
    }
}

thread_local! {
    static ELEMENT_TYPE: Rc<TypeInfo> = {
        let base = TypeInfo::builder("FrameworkElement")
            .property(
                "Width",
                PropertyDef::read_write(|e: &Element| e.width.get(), Element::set_width),
            )
            .property(
                "Height",
                PropertyDef::read_write(|e: &Element| e.height.get(), Element::set_height),
            )
            .build();
        TypeInfo::builder("Element")
            .base(base)
            .property(
                "Text",
                PropertyDef::read_write(|e: &Element| e.text(), Element::set_text),
            )
            .property(
                "Count",
                PropertyDef::read_write(|e: &Element| e.count.get(), Element::set_count),
            )
            .property(
                "Caption",
                PropertyDef::read_only(|e: &Element| format!("[{}]", e.name)),
            )
            .property(
                "Secret",
                PropertyDef::read_write(|e: &Element| e.secret.get(), Element::set_secret)
                    .with_getter_visibility(Visibility::Protected),
            )
            .property(
                "Anything",
                PropertyDef::dynamic(ValueType::object())
                    .with_getter(|e: &Element| Value::new(e.count.get())),
            )
            .build()
    };
}

impl BindableObject for Element {
    fn type_info(&self) -> Rc<TypeInfo> {
        ELEMENT_TYPE.with(Rc::clone)
    }

    fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }
}

impl HostElement for Element {
    fn hooks(&self) -> &ElementHooks {
        &self.hooks
    }

    fn find_name(&self, name: &str) -> Option<ObjectRef> {
        self.children
            .borrow()
            .iter()
            .find(|child| child.name == name)
            .map(|child| child.object())
    }

    fn ambient_context(&self) -> Option<ObjectRef> {
        self.context.borrow().clone()
    }
}

/// Sums every `i32` argument.
pub fn sum() -> FnConverter {
    FnConverter::new(|values| Value::new(values.iter().filter_map(Value::get::<i32>).sum::<i32>()))
}

/// Sums `i32` arguments and splits a total into equal shares, the remainder
/// going to the first source.
pub fn sum_and_split() -> FnConverter {
    sum().with_convert_back(|value, types| {
        let total = value.get::<i32>().unwrap_or(0);
        let n = i32::try_from(types.len()).unwrap_or(i32::MAX).max(1);
        (0..types.len())
            .map(|i| {
                let share = total / n;
                Value::new(if i == 0 { share + total % n } else { share })
            })
            .collect()
    })
}

/// Joins text arguments with a space and splits on the first space.
pub fn full_name() -> FnConverter {
    FnConverter::new(|values| {
        let parts: Vec<String> = values.iter().map(Value::to_text).collect();
        Value::new(parts.join(" "))
    })
    .with_convert_back(|value, types| {
        let text = value.get::<String>().unwrap_or_default();
        let mut parts = text.splitn(types.len().max(1), ' ');
        types
            .iter()
            .map(|_| parts.next().map_or(Value::Unset, Value::from))
            .collect()
    })
}
