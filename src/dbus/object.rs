
use {
    crate::{
        dbus::{
            DbusConnection, DbusError, DbusRequest, DbusTuple, DbusType, Formatter,
            INTROSPECTABLE_INTERFACE, OutgoingMessage, Parser, property,
        },
        ot_error::OtError,
    },
    ahash::AHashMap,
    indexmap::IndexMap,
    std::{
        cell::RefCell,
        collections::BTreeMap,
        fmt::Write,
        rc::{Rc, Weak},
    },
};

pub type MethodHandler = Rc<dyn Fn(DbusRequest)>;
/// Writes the current value of a property as a variant.
pub type PropertyGetter = Rc<dyn Fn(&mut Formatter) -> Result<(), OtError>>;
/// Reads a new value of a property from a variant and applies it.
pub type PropertySetter = Rc<dyn Fn(&mut Parser) -> Result<(), OtError>>;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum HandlerResult {
    Handled,
    NotHandled,
}

type Key = (String, String);

fn key(interface: &str, name: &str) -> Key {
    (interface.to_owned(), name.to_owned())
}

struct Property<H> {
    signature: String,
    handler: H,
}

/// An object served on the bus.
///
/// Handlers are keyed by interface and member. Registering a key twice
/// replaces the earlier handler.
pub struct DbusObject {
    path: String,
    connection: Weak<dyn DbusConnection>,
    methods: RefCell<AHashMap<Key, MethodHandler>>,
    getters: RefCell<IndexMap<Key, Property<PropertyGetter>>>,
    setters: RefCell<AHashMap<Key, Property<PropertySetter>>>,
}

impl DbusObject {
    pub fn new(path: &str, connection: &Rc<dyn DbusConnection>) -> Rc<Self> {
        Rc::new(Self {
            path: path.to_owned(),
            connection: Rc::downgrade(connection),
            methods: Default::default(),
            getters: Default::default(),
            setters: Default::default(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn register_method<F>(&self, interface: &str, name: &str, f: F)
    where
        F: Fn(DbusRequest) + 'static,
    {
        self.methods
            .borrow_mut()
            .insert(key(interface, name), Rc::new(f));
    }

    pub fn register_get_property<T, F>(&self, interface: &str, name: &str, f: F)
    where
        T: DbusType,
        F: Fn() -> Result<T, OtError> + 'static,
    {
        self.register_get_property_raw(interface, name, &T::signature(), move |fmt| {
            let value = f()?;
            fmt.write_variant_as(&value);
            Ok(())
        });
    }

    /// Registers a getter that writes the variant itself. `signature` is
    /// the type it advertises in the introspection data.
    pub fn register_get_property_raw<F>(&self, interface: &str, name: &str, signature: &str, f: F)
    where
        F: Fn(&mut Formatter) -> Result<(), OtError> + 'static,
    {
        self.getters.borrow_mut().insert(
            key(interface, name),
            Property {
                signature: signature.to_owned(),
                handler: Rc::new(f),
            },
        );
    }

    /// Registers a setter. A variant that does not contain a `T` is
    /// rejected with `InvalidArgs` before `f` runs.
    pub fn register_set_property<T, F>(&self, interface: &str, name: &str, f: F)
    where
        T: DbusType,
        F: Fn(T) -> Result<(), OtError> + 'static,
    {
        self.register_set_property_raw(interface, name, &T::signature(), move |parser| {
            let value = parser
                .read_variant_as::<T>()
                .map_err(|_| OtError::InvalidArgs)?;
            f(value)
        });
    }

    pub fn register_set_property_raw<F>(&self, interface: &str, name: &str, signature: &str, f: F)
    where
        F: Fn(&mut Parser) -> Result<(), OtError> + 'static,
    {
        self.setters.borrow_mut().insert(
            key(interface, name),
            Property {
                signature: signature.to_owned(),
                handler: Rc::new(f),
            },
        );
    }

    /// Serves `Introspect` with fixed XML instead of the generated document.
    pub fn set_introspection(&self, xml: &'static str) {
        self.register_method(INTROSPECTABLE_INTERFACE, "Introspect", move |req| {
            req.reply(&(xml.to_owned(),))
        });
    }

    /// Routes one method call. Every `Handled` call has been replied to or
    /// was passed to a registered method handler.
    pub fn handle(&self, request: &DbusRequest) -> HandlerResult {
        let msg = request.message();
        let (Some(interface), Some(member)) = (msg.interface(), msg.member()) else {
            return HandlerResult::NotHandled;
        };
        if interface == property::INTERFACE {
            match member {
                property::GET => {
                    self.get_property_handler(request);
                    return HandlerResult::Handled;
                }
                property::SET => {
                    self.set_property_handler(request);
                    return HandlerResult::Handled;
                }
                property::GET_ALL => {
                    self.get_all_properties_handler(request);
                    return HandlerResult::Handled;
                }
                _ => {}
            }
        }
        let handler = self.methods.borrow().get(&key(interface, member)).cloned();
        if let Some(handler) = handler {
            handler(request.clone());
            return HandlerResult::Handled;
        }
        if interface == INTROSPECTABLE_INTERFACE && member == "Introspect" {
            request.reply(&(self.introspect(),));
            return HandlerResult::Handled;
        }
        HandlerResult::NotHandled
    }

    fn getter(&self, interface: &str, name: &str) -> Option<PropertyGetter> {
        self.getters
            .borrow()
            .get(&key(interface, name))
            .map(|p| p.handler.clone())
    }

    fn get_property_handler(&self, request: &DbusRequest) {
        let Ok((interface, name)) = request.args::<(String, String)>() else {
            request.reply_ot_error(OtError::InvalidArgs);
            return;
        };
        let Some(getter) = self.getter(&interface, &name) else {
            log::debug!("{}: No property {}.{}", self.path, interface, name);
            request.reply_ot_error(OtError::NotFound);
            return;
        };
        let mut reply = OutgoingMessage::method_return(request.message());
        match reply.append_with("v", |fmt| getter(fmt)) {
            Ok(()) => request.send_reply(reply),
            Err(e) => request.reply_ot_error(e),
        }
    }

    fn set_property_handler(&self, request: &DbusRequest) {
        let msg = request.message();
        if msg.signature() != property::SET_SIGNATURE {
            request.reply_ot_error(OtError::InvalidArgs);
            return;
        }
        let mut parser = msg.parser();
        let (Ok(interface), Ok(name)) = (parser.read_string(), parser.read_string()) else {
            request.reply_ot_error(OtError::InvalidArgs);
            return;
        };
        let setter = self
            .setters
            .borrow()
            .get(&key(&interface, &name))
            .map(|p| p.handler.clone());
        let Some(setter) = setter else {
            request.reply_ot_error(OtError::NotFound);
            return;
        };
        let res = setter(&mut parser);
        request.reply_ot_result(res);
    }

    fn get_all_properties_handler(&self, request: &DbusRequest) {
        let Ok((interface,)) = request.args::<(String,)>() else {
            request.reply_ot_error(OtError::InvalidArgs);
            return;
        };
        let getters: Vec<_> = self
            .getters
            .borrow()
            .iter()
            .filter(|((iface, _), _)| *iface == interface)
            .map(|((_, name), p)| (name.clone(), p.handler.clone()))
            .collect();
        let mut reply = OutgoingMessage::method_return(request.message());
        let res = reply.append_with(property::GET_ALL_REPLY_SIGNATURE, |fmt| {
            fmt.write_array_with(8, |fmt| {
                for (name, getter) in &getters {
                    property::write_entry(fmt, name, |fmt| getter(fmt))?;
                }
                Ok(())
            })
        });
        match res {
            Ok(()) => request.send_reply(reply),
            Err(e) => request.reply_ot_error(e),
        }
    }

    /// Emits a signal from this object.
    pub fn signal<T: DbusTuple>(&self, interface: &str, name: &str, args: &T) -> Result<(), DbusError> {
        let mut msg = OutgoingMessage::signal(&self.path, interface, name);
        msg.append(args);
        self.send(&msg)
    }

    pub fn signal_property_changed<T: DbusType>(
        &self,
        interface: &str,
        property: &str,
        value: &T,
    ) -> Result<(), DbusError> {
        self.send(&property::changed_signal(&self.path, interface, property, value))
    }

    fn send(&self, msg: &OutgoingMessage) -> Result<(), DbusError> {
        match self.connection.upgrade() {
            Some(conn) => conn.send(msg).map(drop),
            None => Err(DbusError::Killed),
        }
    }

    /// Generates the introspection document from the registries.
    pub fn introspect(&self) -> String {
        #[derive(Default)]
        struct Iface {
            methods: Vec<String>,
            properties: BTreeMap<String, (String, bool, bool)>,
        }
        let mut ifaces = BTreeMap::<String, Iface>::new();
        for (interface, name) in self.methods.borrow().keys() {
            ifaces
                .entry(interface.clone())
                .or_default()
                .methods
                .push(name.clone());
        }
        for ((interface, name), p) in self.getters.borrow().iter() {
            let iface = ifaces.entry(interface.clone()).or_default();
            let entry = iface
                .properties
                .entry(name.clone())
                .or_insert_with(|| (p.signature.clone(), false, false));
            entry.1 = true;
        }
        for ((interface, name), p) in self.setters.borrow().iter() {
            let iface = ifaces.entry(interface.clone()).or_default();
            let entry = iface
                .properties
                .entry(name.clone())
                .or_insert_with(|| (p.signature.clone(), false, false));
            entry.2 = true;
        }
        let mut xml = String::new();
        xml.push_str(INTROSPECT_HEADER);
        let _ = writeln!(xml, "<node name=\"{}\">", self.path);
        xml.push_str(STANDARD_INTERFACES);
        for (name, iface) in &mut ifaces {
            if name == INTROSPECTABLE_INTERFACE {
                continue;
            }
            iface.methods.sort();
            let _ = writeln!(xml, "  <interface name=\"{}\">", name);
            for method in &iface.methods {
                let _ = writeln!(xml, "    <method name=\"{}\"/>", method);
            }
            for (prop, (signature, read, write)) in &iface.properties {
                let access = match (*read, *write) {
                    (true, true) => "readwrite",
                    (false, true) => "write",
                    _ => "read",
                };
                let _ = writeln!(
                    xml,
                    "    <property name=\"{}\" type=\"{}\" access=\"{}\"/>",
                    prop, signature, access
                );
            }
            xml.push_str("  </interface>\n");
        }
        xml.push_str("</node>\n");
        xml
    }
}

const INTROSPECT_HEADER: &str = "<!DOCTYPE node PUBLIC \"-//freedesktop//DTD D-BUS Object Introspection 1.0//EN\"\n\"http://www.freedesktop.org/standards/dbus/1.0/introspect.dtd\">\n";

const STANDARD_INTERFACES: &str = r#"  <interface name="org.freedesktop.DBus.Properties">
    <method name="Get">
      <arg name="interface_name" type="s" direction="in"/>
      <arg name="property_name" type="s" direction="in"/>
      <arg name="value" type="v" direction="out"/>
    </method>
    <method name="GetAll">
      <arg name="interface_name" type="s" direction="in"/>
      <arg name="props" type="a{sv}" direction="out"/>
    </method>
    <method name="Set">
      <arg name="interface_name" type="s" direction="in"/>
      <arg name="property_name" type="s" direction="in"/>
      <arg name="value" type="v" direction="in"/>
    </method>
    <signal name="PropertiesChanged">
      <arg name="interface_name" type="s"/>
      <arg name="changed_properties" type="a{sv}"/>
      <arg name="invalidated_properties" type="as"/>
    </signal>
  </interface>
  <interface name="org.freedesktop.DBus.Introspectable">
    <method name="Introspect">
      <arg name="xml_data" type="s" direction="out"/>
    </method>
  </interface>
"#;
