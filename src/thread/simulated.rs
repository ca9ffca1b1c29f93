#[cfg(test)]
mod tests;

use {
    crate::{
        mainloop::MainloopContext,
        ot_error::OtError,
        thread::{
            controller::{
                AttachCallback, AttachParams, EnergyScanCallback, JoinerParams,
                MAX_DATASET_TLVS_LEN, ResultCallback, ScanCallback, ThreadController,
            },
            types::{
                ActiveScanResult, ChannelQuality, ChildInfo, DeviceRole, DnssdCounters,
                EnergyScanResult, ExternalRoute, Ip6Prefix, IpCounters, LeaderData,
                LinkModeConfig, MacCounters, MdnsTelemetryInfo, NeighborInfo, OnMeshPrefix,
                SrpServerInfo,
            },
        },
    },
    std::{
        cell::RefCell,
        collections::{BTreeMap, VecDeque},
        mem,
        rc::Rc,
        time::Duration,
    },
};

const TLV_CHANNEL: u8 = 0;
const TLV_PANID: u8 = 1;
const TLV_EXTPANID: u8 = 2;
const TLV_NETWORK_NAME: u8 = 3;
const TLV_PSKC: u8 = 4;
const TLV_NETWORK_KEY: u8 = 5;
const TLV_MESH_LOCAL_PREFIX: u8 = 7;

const MIN_CHANNEL: u16 = 11;
const MAX_CHANNEL: u16 = 26;
const SUPPORTED_CHANNEL_MASK: u32 = 0x07ff_f800;
const ATTACH_ALL_NODES_DELAY_MS: i64 = 30_000;
const HOST_VERSION: &str = concat!("otbr-dbus/", env!("CARGO_PKG_VERSION"), "; simulated");
const RCP_VERSION: &str = "SIMULATED-RCP/1.0; otbr-dbus";

type Task = Box<dyn FnOnce(&SimulatedController)>;

struct State {
    role: DeviceRole,
    link_mode: LinkModeConfig,
    network_name: String,
    pan_id: u16,
    ext_pan_id: u64,
    eui64: u64,
    extended_address: u64,
    channel: u16,
    network_key: Vec<u8>,
    pskc: Vec<u8>,
    mesh_local_prefix: [u8; 8],
    legacy_ula_prefix: [u8; 8],
    active_dataset: Vec<u8>,
    radio_region: u16,
    on_mesh_prefixes: Vec<OnMeshPrefix>,
    external_routes: Vec<ExternalRoute>,
    meshcop_txt: BTreeMap<String, Vec<u8>>,
    joiner_active: bool,
    unsecure_join: Option<(u16, u32)>,
    scan_results: Vec<ActiveScanResult>,
    link_counters: MacCounters,
    ip6_counters: IpCounters,
}

impl Default for State {
    fn default() -> Self {
        Self {
            role: DeviceRole::Disabled,
            link_mode: LinkModeConfig {
                rx_on_when_idle: true,
                device_type: true,
                network_data: true,
            },
            network_name: "OpenThread".to_owned(),
            pan_id: 0xffff,
            ext_pan_id: 0xdead_00be_ef00_cafe,
            eui64: 0x18b4_3000_0000_0001,
            extended_address: 0x1a2b_3c4d_5e6f_7081,
            channel: MIN_CHANNEL,
            network_key: vec![],
            pskc: vec![],
            mesh_local_prefix: [0xfd, 0xde, 0xad, 0x00, 0xbe, 0xef, 0x00, 0x00],
            legacy_ula_prefix: [0; 8],
            active_dataset: vec![],
            radio_region: u16::from_be_bytes(*b"US"),
            on_mesh_prefixes: vec![],
            external_routes: vec![],
            meshcop_txt: Default::default(),
            joiner_active: false,
            unsecure_join: None,
            scan_results: vec![ActiveScanResult {
                ext_address: 0x1122_3344_5566_7788,
                network_name: "NeighborNet".to_owned(),
                ext_pan_id: 0x0102_0304_0506_0708,
                steering_data: vec![0xff],
                pan_id: 0x1234,
                joiner_udp_port: 1000,
                channel: 15,
                rssi: -60,
                lqi: 200,
                version: 4,
                is_native: false,
                is_joinable: true,
            }],
            link_counters: Default::default(),
            ip6_counters: Default::default(),
        }
    }
}

impl State {
    fn is_attached(&self) -> bool {
        matches!(
            self.role,
            DeviceRole::Child | DeviceRole::Router | DeviceRole::Leader
        )
    }

    fn build_dataset(&self) -> Vec<u8> {
        let mut tlvs = vec![];
        let mut push = |ty: u8, value: &[u8]| {
            tlvs.push(ty);
            tlvs.push(value.len() as u8);
            tlvs.extend_from_slice(value);
        };
        let channel = self.channel.to_be_bytes();
        push(TLV_CHANNEL, &[0, channel[0], channel[1]]);
        push(TLV_PANID, &self.pan_id.to_be_bytes());
        push(TLV_EXTPANID, &self.ext_pan_id.to_be_bytes());
        push(TLV_NETWORK_NAME, self.network_name.as_bytes());
        if !self.pskc.is_empty() {
            push(TLV_PSKC, &self.pskc);
        }
        push(TLV_NETWORK_KEY, &self.network_key);
        push(TLV_MESH_LOCAL_PREFIX, &self.mesh_local_prefix);
        tlvs
    }
}

/// An in-memory Thread stack.
///
/// Asynchronous operations complete during the next call to `process`.
#[derive(Default)]
pub struct SimulatedController {
    state: RefCell<State>,
    tasks: RefCell<VecDeque<Task>>,
    role_handlers: RefCell<Vec<Rc<dyn Fn(DeviceRole)>>>,
    dataset_handlers: RefCell<Vec<Rc<dyn Fn(&[u8])>>>,
    reset_handlers: RefCell<Vec<Rc<dyn Fn()>>>,
}

impl SimulatedController {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// The vendor TXT entries last published for MeshCoP.
    pub fn meshcop_txt(&self) -> BTreeMap<String, Vec<u8>> {
        self.state.borrow().meshcop_txt.clone()
    }

    /// The port and timeout of the last unsecure join window.
    pub fn unsecure_join(&self) -> Option<(u16, u32)> {
        self.state.borrow().unsecure_join
    }

    pub fn legacy_ula_prefix(&self) -> [u8; 8] {
        self.state.borrow().legacy_ula_prefix
    }

    pub fn has_pending_tasks(&self) -> bool {
        !self.tasks.borrow().is_empty()
    }

    pub fn update(&self, ctx: &mut MainloopContext) {
        if self.has_pending_tasks() {
            ctx.set_timeout_if_earlier(Duration::ZERO);
        }
    }

    /// Runs the tasks queued before this call.
    pub fn process(&self, _ctx: &MainloopContext) {
        let tasks = mem::take(&mut *self.tasks.borrow_mut());
        for task in tasks {
            task(self);
        }
    }

    fn defer(&self, task: impl FnOnce(&SimulatedController) + 'static) {
        self.tasks.borrow_mut().push_back(Box::new(task));
    }

    fn set_role(&self, role: DeviceRole) {
        let old = mem::replace(&mut self.state.borrow_mut().role, role);
        if old == role {
            return;
        }
        log::info!("Device role changed from {} to {}", old.name(), role.name());
        let handlers = self.role_handlers.borrow().clone();
        for handler in handlers {
            handler(role);
        }
    }

    fn set_dataset(&self, tlvs: Vec<u8>) {
        self.state.borrow_mut().active_dataset = tlvs.clone();
        let handlers = self.dataset_handlers.borrow().clone();
        for handler in handlers {
            handler(&tlvs);
        }
    }

    fn apply_attach_params(&self, params: AttachParams) -> Result<(), OtError> {
        if params.network_key.len() != 16 {
            return Err(OtError::InvalidArgs);
        }
        if !params.pskc.is_empty() && params.pskc.len() != 16 {
            return Err(OtError::InvalidArgs);
        }
        if params.network_name.is_empty() || params.network_name.len() > 16 {
            return Err(OtError::InvalidArgs);
        }
        let Some(channel) =
            (MIN_CHANNEL..=MAX_CHANNEL).find(|&c| params.channel_mask & (1u32 << c) != 0)
        else {
            return Err(OtError::InvalidArgs);
        };
        let tlvs = {
            let mut state = self.state.borrow_mut();
            state.network_key = params.network_key;
            state.pan_id = params.pan_id;
            state.network_name = params.network_name;
            state.ext_pan_id = params.ext_pan_id;
            state.pskc = params.pskc;
            state.channel = channel;
            state.build_dataset()
        };
        self.set_dataset(tlvs);
        Ok(())
    }
}

fn valid_pskd(pskd: &str) -> bool {
    (6..=32).contains(&pskd.len())
        && pskd
            .bytes()
            .all(|b| b.is_ascii_digit() || (b.is_ascii_uppercase() && !b"IOQZ".contains(&b)))
}

fn check_prefix(prefix: &Ip6Prefix) -> Result<(), OtError> {
    if prefix.prefix.len() > 16 || prefix.length > 128 {
        return Err(OtError::InvalidArgs);
    }
    Ok(())
}

impl ThreadController for SimulatedController {
    fn scan(&self, done: ScanCallback) {
        self.defer(move |slf| {
            let results = slf.state.borrow().scan_results.clone();
            done(Ok(results));
        });
    }

    fn energy_scan(&self, duration_ms: u32, done: EnergyScanCallback) {
        self.defer(move |_| {
            if duration_ms == 0 {
                done(Err(OtError::InvalidArgs));
                return;
            }
            let results = (MIN_CHANNEL..=MAX_CHANNEL)
                .map(|c| EnergyScanResult {
                    channel: c as u8,
                    max_rssi: -100 + (c as i8 - MIN_CHANNEL as i8) * 2,
                })
                .collect();
            done(Ok(results));
        });
    }

    fn attach(&self, params: Option<AttachParams>, done: AttachCallback) {
        self.defer(move |slf| {
            if slf.state.borrow().is_attached() {
                done(Err(OtError::InvalidState));
                return;
            }
            let res = match params {
                Some(params) => slf.apply_attach_params(params),
                None if slf.state.borrow().active_dataset.is_empty() => Err(OtError::InvalidState),
                None => Ok(()),
            };
            if let Err(e) = res {
                done(Err(e));
                return;
            }
            slf.set_role(DeviceRole::Leader);
            done(Ok(0));
        });
    }

    fn attach_all_nodes_to(&self, dataset_tlvs: Vec<u8>, done: AttachCallback) {
        self.defer(move |slf| {
            if dataset_tlvs.is_empty() || dataset_tlvs.len() > MAX_DATASET_TLVS_LEN {
                done(Err(OtError::InvalidArgs));
                return;
            }
            if !slf.state.borrow().is_attached() {
                done(Err(OtError::InvalidState));
                return;
            }
            slf.set_dataset(dataset_tlvs);
            done(Ok(ATTACH_ALL_NODES_DELAY_MS));
        });
    }

    fn joiner_start(&self, params: JoinerParams, done: ResultCallback) {
        if !valid_pskd(&params.pskd) {
            done(Err(OtError::InvalidArgs));
            return;
        }
        if self.state.borrow().is_attached() {
            done(Err(OtError::InvalidState));
            return;
        }
        self.state.borrow_mut().joiner_active = true;
        self.defer(move |slf| {
            if !mem::take(&mut slf.state.borrow_mut().joiner_active) {
                done(Err(OtError::Abort));
                return;
            }
            log::info!("Joined as {} {}", params.vendor_name, params.vendor_model);
            slf.set_role(DeviceRole::Child);
            done(Ok(()));
        });
    }

    fn detach(&self) -> Result<(), OtError> {
        self.set_role(DeviceRole::Disabled);
        Ok(())
    }

    fn erase_persistent_info(&self) -> Result<(), OtError> {
        let mut state = self.state.borrow_mut();
        if state.role != DeviceRole::Disabled {
            return Err(OtError::InvalidState);
        }
        *state = State::default();
        Ok(())
    }

    fn reset(&self) {
        self.state.borrow_mut().joiner_active = false;
        self.set_role(DeviceRole::Disabled);
        let handlers = self.reset_handlers.borrow().clone();
        for handler in handlers {
            handler();
        }
    }

    fn joiner_stop(&self) {
        self.state.borrow_mut().joiner_active = false;
    }

    fn permit_unsecure_join(&self, port: u16, timeout: u32) -> Result<(), OtError> {
        if port == 0 {
            return Err(OtError::InvalidArgs);
        }
        self.state.borrow_mut().unsecure_join = Some((port, timeout));
        Ok(())
    }

    fn add_on_mesh_prefix(&self, prefix: OnMeshPrefix) -> Result<(), OtError> {
        check_prefix(&prefix.prefix)?;
        let mut state = self.state.borrow_mut();
        state.on_mesh_prefixes.retain(|p| p.prefix != prefix.prefix);
        state.on_mesh_prefixes.push(prefix);
        Ok(())
    }

    fn remove_on_mesh_prefix(&self, prefix: Ip6Prefix) -> Result<(), OtError> {
        check_prefix(&prefix)?;
        let mut state = self.state.borrow_mut();
        let len = state.on_mesh_prefixes.len();
        state.on_mesh_prefixes.retain(|p| p.prefix != prefix);
        if state.on_mesh_prefixes.len() == len {
            return Err(OtError::NotFound);
        }
        Ok(())
    }

    fn add_external_route(&self, route: ExternalRoute) -> Result<(), OtError> {
        check_prefix(&route.prefix)?;
        let mut state = self.state.borrow_mut();
        state.external_routes.retain(|r| r.prefix != route.prefix);
        state.external_routes.push(route);
        Ok(())
    }

    fn remove_external_route(&self, prefix: Ip6Prefix) -> Result<(), OtError> {
        check_prefix(&prefix)?;
        let mut state = self.state.borrow_mut();
        let len = state.external_routes.len();
        state.external_routes.retain(|r| r.prefix != prefix);
        if state.external_routes.len() == len {
            return Err(OtError::NotFound);
        }
        Ok(())
    }

    fn update_meshcop_txt(&self, entries: BTreeMap<String, Vec<u8>>) -> Result<(), OtError> {
        self.state.borrow_mut().meshcop_txt = entries;
        Ok(())
    }

    fn link_mode(&self) -> Result<LinkModeConfig, OtError> {
        Ok(self.state.borrow().link_mode)
    }

    fn set_link_mode(&self, mode: LinkModeConfig) -> Result<(), OtError> {
        self.state.borrow_mut().link_mode = mode;
        Ok(())
    }

    fn device_role(&self) -> DeviceRole {
        self.state.borrow().role
    }

    fn network_name(&self) -> Result<String, OtError> {
        Ok(self.state.borrow().network_name.clone())
    }

    fn pan_id(&self) -> Result<u16, OtError> {
        Ok(self.state.borrow().pan_id)
    }

    fn ext_pan_id(&self) -> Result<u64, OtError> {
        Ok(self.state.borrow().ext_pan_id)
    }

    fn eui64(&self) -> Result<u64, OtError> {
        Ok(self.state.borrow().eui64)
    }

    fn channel(&self) -> Result<u16, OtError> {
        Ok(self.state.borrow().channel)
    }

    fn network_key(&self) -> Result<Vec<u8>, OtError> {
        Ok(self.state.borrow().network_key.clone())
    }

    fn cca_failure_rate(&self) -> Result<u16, OtError> {
        Ok(0)
    }

    fn link_counters(&self) -> Result<MacCounters, OtError> {
        Ok(self.state.borrow().link_counters.clone())
    }

    fn ip6_counters(&self) -> Result<IpCounters, OtError> {
        Ok(self.state.borrow().ip6_counters.clone())
    }

    fn supported_channel_mask(&self) -> Result<u32, OtError> {
        Ok(SUPPORTED_CHANNEL_MASK)
    }

    fn rloc16(&self) -> Result<u16, OtError> {
        match self.state.borrow().role {
            DeviceRole::Leader | DeviceRole::Router => Ok(0x0400),
            DeviceRole::Child => Ok(0x0401),
            _ => Ok(0xfffe),
        }
    }

    fn extended_address(&self) -> Result<u64, OtError> {
        Ok(self.state.borrow().extended_address)
    }

    fn router_id(&self) -> Result<u8, OtError> {
        let state = self.state.borrow();
        match state.role {
            DeviceRole::Leader | DeviceRole::Router => Ok(1),
            _ => Err(OtError::InvalidState),
        }
    }

    fn leader_data(&self) -> Result<LeaderData, OtError> {
        if !self.state.borrow().is_attached() {
            return Err(OtError::Detached);
        }
        Ok(LeaderData {
            partition_id: self.partition_id()?,
            weighting: 64,
            data_version: 1,
            stable_data_version: 1,
            leader_router_id: 1,
        })
    }

    fn network_data(&self) -> Result<Vec<u8>, OtError> {
        Ok(vec![])
    }

    fn stable_network_data(&self) -> Result<Vec<u8>, OtError> {
        Ok(vec![])
    }

    fn local_leader_weight(&self) -> Result<u8, OtError> {
        Ok(64)
    }

    fn channel_monitor_sample_count(&self) -> Result<u32, OtError> {
        Ok(0)
    }

    fn channel_monitor_all_channel_qualities(&self) -> Result<Vec<ChannelQuality>, OtError> {
        Ok((MIN_CHANNEL..=MAX_CHANNEL)
            .map(|c| ChannelQuality {
                channel: c as u8,
                occupancy: 0,
            })
            .collect())
    }

    fn child_table(&self) -> Result<Vec<ChildInfo>, OtError> {
        Ok(vec![])
    }

    fn neighbor_table(&self) -> Result<Vec<NeighborInfo>, OtError> {
        Ok(vec![])
    }

    fn partition_id(&self) -> Result<u32, OtError> {
        Ok(0x4d2f_1a3c)
    }

    fn instant_rssi(&self) -> Result<i8, OtError> {
        Ok(-98)
    }

    fn radio_tx_power(&self) -> Result<i8, OtError> {
        Ok(8)
    }

    fn external_routes(&self) -> Result<Vec<ExternalRoute>, OtError> {
        Ok(self.state.borrow().external_routes.clone())
    }

    fn on_mesh_prefixes(&self) -> Result<Vec<OnMeshPrefix>, OtError> {
        Ok(self.state.borrow().on_mesh_prefixes.clone())
    }

    fn active_dataset_tlvs(&self) -> Result<Vec<u8>, OtError> {
        let state = self.state.borrow();
        if state.active_dataset.is_empty() {
            return Err(OtError::NotFound);
        }
        Ok(state.active_dataset.clone())
    }

    fn set_active_dataset_tlvs(&self, tlvs: Vec<u8>) -> Result<(), OtError> {
        if tlvs.len() > MAX_DATASET_TLVS_LEN {
            return Err(OtError::InvalidArgs);
        }
        self.set_dataset(tlvs);
        Ok(())
    }

    fn radio_region(&self) -> Result<u16, OtError> {
        Ok(self.state.borrow().radio_region)
    }

    fn set_radio_region(&self, code: u16) -> Result<(), OtError> {
        self.state.borrow_mut().radio_region = code;
        Ok(())
    }

    fn set_mesh_local_prefix(&self, prefix: [u8; 8]) -> Result<(), OtError> {
        let mut state = self.state.borrow_mut();
        if state.role != DeviceRole::Disabled {
            return Err(OtError::InvalidState);
        }
        state.mesh_local_prefix = prefix;
        Ok(())
    }

    fn set_legacy_ula_prefix(&self, prefix: [u8; 8]) -> Result<(), OtError> {
        self.state.borrow_mut().legacy_ula_prefix = prefix;
        Ok(())
    }

    fn srp_server_info(&self) -> Result<SrpServerInfo, OtError> {
        Ok(SrpServerInfo {
            port: 53535,
            ..Default::default()
        })
    }

    fn mdns_telemetry_info(&self) -> Result<MdnsTelemetryInfo, OtError> {
        Ok(Default::default())
    }

    fn dnssd_counters(&self) -> Result<DnssdCounters, OtError> {
        Ok(Default::default())
    }

    fn ot_host_version(&self) -> Result<String, OtError> {
        Ok(HOST_VERSION.to_owned())
    }

    fn ot_rcp_version(&self) -> Result<String, OtError> {
        Ok(RCP_VERSION.to_owned())
    }

    fn thread_version(&self) -> Result<u16, OtError> {
        Ok(4)
    }

    fn add_device_role_handler(&self, handler: Box<dyn Fn(DeviceRole)>) {
        self.role_handlers.borrow_mut().push(Rc::from(handler));
    }

    fn add_active_dataset_change_handler(&self, handler: Box<dyn Fn(&[u8])>) {
        self.dataset_handlers.borrow_mut().push(Rc::from(handler));
    }

    fn add_reset_handler(&self, handler: Box<dyn Fn()>) {
        self.reset_handlers.borrow_mut().push(Rc::from(handler));
    }
}
