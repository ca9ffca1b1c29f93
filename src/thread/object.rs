
use {
    crate::{
        dbus::{
            DbusConnection, DbusError, DbusObject, DbusRequest, DbusType, Formatter,
            OutgoingMessage, object::PropertyGetter,
        },
        ot_error::OtError,
        thread::{
            controller::{AttachParams, JoinerParams, MAX_DATASET_TLVS_LEN, ThreadController},
            names::*,
            types::{DeviceRole, ExternalRoute, Ip6Prefix, LinkModeConfig, OnMeshPrefix, TxtEntry},
        },
        utils::errorfmt::ErrorFmt,
    },
    ahash::AHashMap,
    std::{
        cell::RefCell,
        collections::BTreeMap,
        rc::{Rc, Weak},
    },
};

const INTROSPECTION: &str = include_str!("introspect.xml");

const RESERVED_TXT_KEYS: [&str; 11] = [
    "rv", "tv", "sb", "nn", "xp", "at", "pt", "dn", "sq", "bb", "omr",
];

/// The Border Router object of one Thread interface.
pub struct ThreadObject {
    object: Rc<DbusObject>,
    controller: Rc<dyn ThreadController>,
    getters: RefCell<AHashMap<&'static str, PropertyGetter>>,
}

impl ThreadObject {
    pub fn new(
        connection: &Rc<dyn DbusConnection>,
        interface_name: &str,
        controller: Rc<dyn ThreadController>,
    ) -> Rc<Self> {
        Rc::new(Self {
            object: DbusObject::new(&object_path(interface_name), connection),
            controller,
            getters: Default::default(),
        })
    }

    pub fn object(&self) -> &Rc<DbusObject> {
        &self.object
    }

    /// Registers the handlers, subscribes to the controller and announces
    /// the object with the `Ready` signal.
    pub fn init(self: &Rc<Self>) -> Result<(), DbusError> {
        self.register_methods();
        self.register_properties();
        self.object.set_introspection(INTROSPECTION);
        self.subscribe();
        self.object.signal(INTERFACE, SIGNAL_READY, &())
    }

    fn method<F>(&self, name: &str, f: F)
    where
        F: Fn(&dyn ThreadController, DbusRequest) + 'static,
    {
        let controller = self.controller.clone();
        self.object
            .register_method(INTERFACE, name, move |req| f(&*controller, req));
    }

    fn getter<T, F>(&self, name: &'static str, f: F)
    where
        T: DbusType,
        F: Fn(&dyn ThreadController) -> Result<T, OtError> + 'static,
    {
        let controller = self.controller.clone();
        let getter: PropertyGetter = Rc::new(move |fmt: &mut Formatter| {
            let value = f(&*controller)?;
            fmt.write_variant_as(&value);
            Ok(())
        });
        self.getters.borrow_mut().insert(name, getter.clone());
        self.object
            .register_get_property_raw(INTERFACE, name, &T::signature(), move |fmt| getter(fmt));
    }

    fn setter<T, F>(&self, name: &str, f: F)
    where
        T: DbusType,
        F: Fn(&dyn ThreadController, T) -> Result<(), OtError> + 'static,
    {
        let controller = self.controller.clone();
        self.object
            .register_set_property(INTERFACE, name, move |v| f(&*controller, v));
    }

    fn register_methods(self: &Rc<Self>) {
        self.method(METHOD_SCAN, |c, req| {
            c.scan(Box::new(move |res| req.reply_ot_result_with(res)));
        });
        self.method(METHOD_ENERGY_SCAN, |c, req| {
            let Ok((duration,)) = req.args::<(u32,)>() else {
                req.reply_ot_error(OtError::InvalidArgs);
                return;
            };
            c.energy_scan(duration, Box::new(move |res| req.reply_ot_result_with(res)));
        });
        self.method(METHOD_ATTACH, |c, req| {
            let params = if req.message().is_body_empty() {
                None
            } else {
                match req.args::<(Vec<u8>, u16, String, u64, Vec<u8>, u32)>() {
                    Ok((network_key, pan_id, network_name, ext_pan_id, pskc, channel_mask)) => {
                        Some(AttachParams {
                            network_key,
                            pan_id,
                            network_name,
                            ext_pan_id,
                            pskc,
                            channel_mask,
                        })
                    }
                    Err(_) => {
                        req.reply_ot_error(OtError::InvalidArgs);
                        return;
                    }
                }
            };
            c.attach(params, Box::new(move |res| req.reply_ot_result(res.map(drop))));
        });
        self.method(METHOD_ATTACH_ALL_NODES_TO, |c, req| {
            let Ok((dataset,)) = req.args::<(Vec<u8>,)>() else {
                req.reply_ot_error(OtError::InvalidArgs);
                return;
            };
            c.attach_all_nodes_to(dataset, Box::new(move |res| req.reply_ot_result_with(res)));
        });
        self.method(METHOD_DETACH, |c, req| req.reply_ot_result(c.detach()));
        self.method(METHOD_FACTORY_RESET, |c, req| {
            let res = c.detach().and_then(|_| c.erase_persistent_info());
            if res.is_ok() {
                c.reset();
            }
            req.reply_ot_result(res);
        });
        self.method(METHOD_RESET, |c, req| {
            c.reset();
            req.reply_ot_result(Ok(()));
        });
        self.method(METHOD_JOINER_START, |c, req| {
            let args = req.args::<(String, String, String, String, String, String)>();
            let Ok((pskd, provisioning_url, vendor_name, vendor_model, sw_version, data)) = args
            else {
                req.reply_ot_error(OtError::InvalidArgs);
                return;
            };
            let params = JoinerParams {
                pskd,
                provisioning_url,
                vendor_name,
                vendor_model,
                vendor_sw_version: sw_version,
                vendor_data: data,
            };
            c.joiner_start(params, Box::new(move |res| req.reply_ot_result(res)));
        });
        self.method(METHOD_JOINER_STOP, |c, req| {
            c.joiner_stop();
            req.reply_ot_result(Ok(()));
        });
        self.method(METHOD_PERMIT_UNSECURE_JOIN, |c, req| match req.args::<(u16, u32)>() {
            Ok((port, timeout)) => req.reply_ot_result(c.permit_unsecure_join(port, timeout)),
            Err(_) => req.reply_ot_error(OtError::InvalidArgs),
        });
        self.method(METHOD_ADD_ON_MESH_PREFIX, |c, req| match req.args::<(OnMeshPrefix,)>() {
            Ok((prefix,)) => req.reply_ot_result(c.add_on_mesh_prefix(prefix)),
            Err(_) => req.reply_ot_error(OtError::InvalidArgs),
        });
        self.method(METHOD_REMOVE_ON_MESH_PREFIX, |c, req| match req.args::<(Ip6Prefix,)>() {
            Ok((prefix,)) => req.reply_ot_result(c.remove_on_mesh_prefix(prefix)),
            Err(_) => req.reply_ot_error(OtError::InvalidArgs),
        });
        self.method(METHOD_ADD_EXTERNAL_ROUTE, |c, req| match req.args::<(ExternalRoute,)>() {
            Ok((route,)) => req.reply_ot_result(c.add_external_route(route)),
            Err(_) => req.reply_ot_error(OtError::InvalidArgs),
        });
        self.method(METHOD_REMOVE_EXTERNAL_ROUTE, |c, req| match req.args::<(Ip6Prefix,)>() {
            Ok((prefix,)) => req.reply_ot_result(c.remove_external_route(prefix)),
            Err(_) => req.reply_ot_error(OtError::InvalidArgs),
        });
        self.method(METHOD_UPDATE_VENDOR_MESHCOP_TXT, |c, req| {
            let res = match req.args::<(Vec<TxtEntry>,)>() {
                Ok((entries,)) => update_meshcop_txt(c, entries),
                Err(_) => Err(OtError::InvalidArgs),
            };
            req.reply_ot_result(res);
        });
        let slf = Rc::downgrade(self);
        self.object
            .register_method(INTERFACE, METHOD_GET_PROPERTIES, move |req| {
                if let Some(slf) = slf.upgrade() {
                    slf.get_properties(req);
                }
            });
    }

    fn get_properties(&self, req: DbusRequest) {
        let Ok((names,)) = req.args::<(Vec<String>,)>() else {
            req.reply_ot_error(OtError::InvalidArgs);
            return;
        };
        let mut getters = Vec::with_capacity(names.len());
        {
            let registered = self.getters.borrow();
            for name in &names {
                let Some(getter) = registered.get(name.as_str()) else {
                    log::debug!("GetProperties: Unknown property {}", name);
                    req.reply_ot_error(OtError::NotFound);
                    return;
                };
                getters.push(getter.clone());
            }
        }
        let mut reply = OutgoingMessage::method_return(req.message());
        let res = reply.append_with("av", |fmt| {
            fmt.write_array_with(1, |fmt| {
                for getter in &getters {
                    getter(fmt)?;
                }
                Ok(())
            })
        });
        match res {
            Ok(()) => req.send_reply(reply),
            Err(e) => req.reply_ot_error(e),
        }
    }

    fn register_properties(&self) {
        self.setter(PROPERTY_MESH_LOCAL_PREFIX, |c, prefix: Vec<u8>| {
            let prefix = prefix.try_into().map_err(|_| OtError::InvalidArgs)?;
            c.set_mesh_local_prefix(prefix)
        });
        self.setter(PROPERTY_LEGACY_ULA_PREFIX, |c, prefix: Vec<u8>| {
            let prefix = prefix.try_into().map_err(|_| OtError::InvalidArgs)?;
            c.set_legacy_ula_prefix(prefix)
        });
        self.setter(PROPERTY_LINK_MODE, |c, mode: LinkModeConfig| c.set_link_mode(mode));
        self.setter(PROPERTY_ACTIVE_DATASET_TLVS, |c, tlvs: Vec<u8>| {
            if tlvs.len() > MAX_DATASET_TLVS_LEN {
                return Err(OtError::InvalidArgs);
            }
            c.set_active_dataset_tlvs(tlvs)
        });
        self.setter(PROPERTY_RADIO_REGION, |c, region: String| {
            c.set_radio_region(parse_region(&region)?)
        });

        self.getter(PROPERTY_LINK_MODE, |c| c.link_mode());
        self.getter(PROPERTY_DEVICE_ROLE, |c| Ok(c.device_role().name().to_owned()));
        self.getter(PROPERTY_NETWORK_NAME, |c| c.network_name());
        self.getter(PROPERTY_PANID, |c| c.pan_id());
        self.getter(PROPERTY_EXTPANID, |c| c.ext_pan_id());
        self.getter(PROPERTY_EUI64, |c| c.eui64());
        self.getter(PROPERTY_CHANNEL, |c| c.channel());
        self.getter(PROPERTY_NETWORK_KEY, |c| c.network_key());
        self.getter(PROPERTY_CCA_FAILURE_RATE, |c| c.cca_failure_rate());
        self.getter(PROPERTY_LINK_COUNTERS, |c| c.link_counters());
        self.getter(PROPERTY_IP6_COUNTERS, |c| c.ip6_counters());
        self.getter(PROPERTY_SUPPORTED_CHANNEL_MASK, |c| c.supported_channel_mask());
        self.getter(PROPERTY_RLOC16, |c| c.rloc16());
        self.getter(PROPERTY_EXTENDED_ADDRESS, |c| c.extended_address());
        self.getter(PROPERTY_ROUTER_ID, |c| c.router_id());
        self.getter(PROPERTY_LEADER_DATA, |c| c.leader_data());
        self.getter(PROPERTY_NETWORK_DATA, |c| c.network_data());
        self.getter(PROPERTY_STABLE_NETWORK_DATA, |c| c.stable_network_data());
        self.getter(PROPERTY_LOCAL_LEADER_WEIGHT, |c| c.local_leader_weight());
        self.getter(PROPERTY_CHANNEL_MONITOR_SAMPLE_COUNT, |c| {
            c.channel_monitor_sample_count()
        });
        self.getter(PROPERTY_CHANNEL_MONITOR_ALL_CHANNEL_QUALITIES, |c| {
            c.channel_monitor_all_channel_qualities()
        });
        self.getter(PROPERTY_CHILD_TABLE, |c| c.child_table());
        self.getter(PROPERTY_NEIGHBOR_TABLE, |c| c.neighbor_table());
        self.getter(PROPERTY_PARTITION_ID, |c| c.partition_id());
        self.getter(PROPERTY_INSTANT_RSSI, |c| c.instant_rssi());
        self.getter(PROPERTY_RADIO_TX_POWER, |c| c.radio_tx_power());
        self.getter(PROPERTY_EXTERNAL_ROUTES, |c| c.external_routes());
        self.getter(PROPERTY_ON_MESH_PREFIXES, |c| c.on_mesh_prefixes());
        self.getter(PROPERTY_ACTIVE_DATASET_TLVS, |c| c.active_dataset_tlvs());
        self.getter(PROPERTY_RADIO_REGION, |c| Ok(format_region(c.radio_region()?)));
        self.getter(PROPERTY_SRP_SERVER_INFO, |c| c.srp_server_info());
        self.getter(PROPERTY_MDNS_TELEMETRY_INFO, |c| c.mdns_telemetry_info());
        self.getter(PROPERTY_DNSSD_COUNTERS, |c| c.dnssd_counters());
        self.getter(PROPERTY_OT_HOST_VERSION, |c| c.ot_host_version());
        self.getter(PROPERTY_OT_RCP_VERSION, |c| c.ot_rcp_version());
        self.getter(PROPERTY_THREAD_VERSION, |c| c.thread_version());
    }

    fn subscribe(&self) {
        let object = Rc::downgrade(&self.object);
        self.controller.add_device_role_handler(Box::new(move |role| {
            signal_role(&object, role);
        }));
        let object = Rc::downgrade(&self.object);
        self.controller
            .add_active_dataset_change_handler(Box::new(move |tlvs| {
                let Some(object) = object.upgrade() else {
                    return;
                };
                let res = object.signal_property_changed(
                    INTERFACE,
                    PROPERTY_ACTIVE_DATASET_TLVS,
                    &tlvs.to_vec(),
                );
                if let Err(e) = res {
                    log::warn!("Could not signal the dataset change: {}", ErrorFmt(e));
                }
            }));
        let object = Rc::downgrade(&self.object);
        self.controller.add_reset_handler(Box::new(move || {
            signal_role(&object, DeviceRole::Disabled);
        }));
    }
}

fn signal_role(object: &Weak<DbusObject>, role: DeviceRole) {
    let Some(object) = object.upgrade() else {
        return;
    };
    let res = object.signal_property_changed(
        INTERFACE,
        PROPERTY_DEVICE_ROLE,
        &role.name().to_owned(),
    );
    if let Err(e) = res {
        log::warn!("Could not signal the role change: {}", ErrorFmt(e));
    }
}

fn update_meshcop_txt(c: &dyn ThreadController, entries: Vec<TxtEntry>) -> Result<(), OtError> {
    let update: BTreeMap<_, _> = entries.into_iter().map(|e| (e.key, e.value)).collect();
    if RESERVED_TXT_KEYS.iter().any(|k| update.contains_key(*k)) {
        return Err(OtError::InvalidArgs);
    }
    c.update_meshcop_txt(update)
}

/// Packs a two-character region code, first character in the high byte.
pub fn parse_region(region: &str) -> Result<u16, OtError> {
    match region.as_bytes() {
        &[a, b] => Ok(u16::from_be_bytes([a, b])),
        _ => Err(OtError::InvalidArgs),
    }
}

pub fn format_region(code: u16) -> String {
    let [a, b] = code.to_be_bytes();
    String::from_utf8_lossy(&[a, b]).into_owned()
}
