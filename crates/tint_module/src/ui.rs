//! User interface descriptors attached to interfaces
//!
//! A descriptor does not render anything. It names the module to users,
//! files it under a category, declares advanced options and points at the
//! hooks a front end calls to build and validate an options dialog.

use std::any::Any;
use std::sync::Arc;
use tint_core::object::{Entity, EntityType, NameType, Object, Ref};
use tint_core::{Allocator, Options, Status, StructKind, Version, HOST_API_VERSION};

/// Look up a text by selector (`"name"`, `"help"`, ...) and name type
pub type GetText = Arc<dyn Fn(&str, NameType) -> Option<String> + Send + Sync>;

/// Produce a UI description for the given options
pub type UiGetter = Arc<dyn Fn(&Options) -> String + Send + Sync>;

/// Check user-provided options, returning an issue status for doubtful input
pub type OptionsValidator = Arc<dyn Fn(&Options) -> Status + Send + Sync>;

/// React to a widget event, returning the options to change
pub type WidgetEvent = Arc<dyn Fn(&Options, &str, &str) -> Options + Send + Sync>;

/// UI descriptor of an interface
pub struct ModuleUi {
    pub(crate) module_api: Version,
    pub(crate) category: String,
    pub(crate) options: Options,
    pub(crate) texts: Vec<String>,
    pub(crate) get_text: Option<GetText>,
    pub(crate) ui_getter: Option<UiGetter>,
    pub(crate) validator: Option<OptionsValidator>,
    pub(crate) widget_event: Option<WidgetEvent>,
    object: Object,
}

/// Builder for [`ModuleUi`]
#[derive(Default)]
pub struct ModuleUiBuilder {
    module_api: Version,
    category: String,
    options: Options,
    texts: Vec<String>,
    get_text: Option<GetText>,
    ui_getter: Option<UiGetter>,
    validator: Option<OptionsValidator>,
    widget_event: Option<WidgetEvent>,
    alloc: Option<Allocator>,
}

impl ModuleUiBuilder {
    pub fn module_api(mut self, version: Version) -> Self {
        self.module_api = version;
        self
    }

    /// Category path, e.g. `Color/CMM/lcms`
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Advanced options with their defaults
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Texts answered by `get_text`; `"name"` is expected
    pub fn texts(mut self, texts: &[&str]) -> Self {
        self.texts = texts.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn get_text(mut self, f: GetText) -> Self {
        self.get_text = Some(f);
        self
    }

    pub fn ui_getter(mut self, f: UiGetter) -> Self {
        self.ui_getter = Some(f);
        self
    }

    pub fn validator(mut self, f: OptionsValidator) -> Self {
        self.validator = Some(f);
        self
    }

    pub fn widget_event(mut self, f: WidgetEvent) -> Self {
        self.widget_event = Some(f);
        self
    }

    pub fn alloc(mut self, alloc: Allocator) -> Self {
        self.alloc = Some(alloc);
        self
    }

    pub fn build(self) -> Ref<ModuleUi> {
        Ref::new(ModuleUi {
            module_api: self.module_api,
            category: self.category,
            options: self.options,
            texts: self.texts,
            get_text: self.get_text,
            ui_getter: self.ui_getter,
            validator: self.validator,
            widget_event: self.widget_event,
            object: Object::new(StructKind::ModuleUi, self.alloc),
        })
    }
}

impl ModuleUi {
    /// Builder targeting the current host API
    pub fn builder() -> ModuleUiBuilder {
        ModuleUiBuilder {
            module_api: HOST_API_VERSION,
            ..Default::default()
        }
    }

    pub fn module_api(&self) -> Version {
        self.module_api
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    /// Text for a selector, `None` if the descriptor has no text getter
    pub fn text(&self, select: &str, ty: NameType) -> Option<String> {
        self.get_text.as_ref().and_then(|f| f(select, ty))
    }

    /// UI description for `options`
    pub fn ui(&self, options: &Options) -> Option<String> {
        self.ui_getter.as_ref().map(|f| f(options))
    }

    /// Validate user options; descriptors without a validator accept all
    pub fn validate(&self, options: &Options) -> Status {
        self.validator.as_ref().map_or(Status::OK, |f| f(options))
    }

    /// Forward a widget event
    pub fn widget_event(&self, options: &Options, widget: &str, event: &str) -> Option<Options> {
        self.widget_event.as_ref().map(|f| f(options, widget, event))
    }
}

impl Entity for ModuleUi {
    fn object(&self) -> &Object {
        &self.object
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl EntityType for ModuleUi {}
