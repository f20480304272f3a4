use crate::config::OpenVrConfig;
use crate::interface::OpenVrInterface;
use crate::server::ServerHandle;
use crate::session::SessionHandle;
use std::any::Any;
use std::collections::HashMap;

type Constructor = Box<dyn Fn() -> Box<dyn Any> + Send + Sync>;

/// Stand-in for the host's class database: scriptable classes registered by
/// name with a constructor the host invokes on demand.
pub struct ClassRegistry {
    classes: HashMap<&'static str, Constructor>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self {
            classes: HashMap::new(),
        }
    }

    /// Registers a class constructor; returns false when the name is taken.
    pub fn register_class(&mut self, name: &'static str, constructor: Constructor) -> bool {
        if self.classes.contains_key(name) {
            log::warn!("[registry] class {name:?} already registered");
            return false;
        }
        self.classes.insert(name, constructor);
        true
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn instantiate(&self, name: &str) -> Option<Box<dyn Any>> {
        self.classes.get(name).map(|constructor| constructor())
    }

    pub fn class_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.classes.keys().copied()
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// One-time module-load hook: registers the bridge's scriptable classes with
/// the host class database. Every constructed object shares the same session
/// and server handles.
pub fn register_types(registry: &mut ClassRegistry, session: SessionHandle, server: ServerHandle) {
    {
        let session = session.clone();
        let server = server.clone();
        registry.register_class(
            "XRInterfaceOpenVR",
            Box::new(move || {
                let mut interface = OpenVrInterface::new(session.clone());
                interface.bind_server(server.clone());
                Box::new(interface) as Box<dyn Any>
            }),
        );
    }

    registry.register_class(
        "OpenVRConfig",
        Box::new(move || {
            Box::new(OpenVrConfig::new(session.clone(), server.clone())) as Box<dyn Any>
        }),
    );

    log::info!("[registry] OpenVR bridge classes registered");
}
