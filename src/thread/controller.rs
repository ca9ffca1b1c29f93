use {
    crate::{
        ot_error::OtError,
        thread::types::{
            ActiveScanResult, ChannelQuality, ChildInfo, DeviceRole, DnssdCounters,
            EnergyScanResult, ExternalRoute, Ip6Prefix, IpCounters, LeaderData, LinkModeConfig,
            MacCounters, MdnsTelemetryInfo, NeighborInfo, OnMeshPrefix, SrpServerInfo,
        },
    },
    std::collections::BTreeMap,
};

/// The largest active dataset a controller accepts.
pub const MAX_DATASET_TLVS_LEN: usize = 254;

pub type ScanCallback = Box<dyn FnOnce(Result<Vec<ActiveScanResult>, OtError>)>;
pub type EnergyScanCallback = Box<dyn FnOnce(Result<Vec<EnergyScanResult>, OtError>)>;
/// Receives the delay in milliseconds after which the attach takes effect.
pub type AttachCallback = Box<dyn FnOnce(Result<i64, OtError>)>;
pub type ResultCallback = Box<dyn FnOnce(Result<(), OtError>)>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttachParams {
    pub network_key: Vec<u8>,
    pub pan_id: u16,
    pub network_name: String,
    pub ext_pan_id: u64,
    pub pskc: Vec<u8>,
    pub channel_mask: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JoinerParams {
    pub pskd: String,
    pub provisioning_url: String,
    pub vendor_name: String,
    pub vendor_model: String,
    pub vendor_sw_version: String,
    pub vendor_data: String,
}

/// The Thread stack behind the Border Router object.
///
/// Operations that take a callback complete later, from the reactor loop.
pub trait ThreadController {
    fn scan(&self, done: ScanCallback);
    fn energy_scan(&self, duration_ms: u32, done: EnergyScanCallback);
    /// Attaches with `params`, or with the active dataset if `None`.
    fn attach(&self, params: Option<AttachParams>, done: AttachCallback);
    fn attach_all_nodes_to(&self, dataset_tlvs: Vec<u8>, done: AttachCallback);
    fn joiner_start(&self, params: JoinerParams, done: ResultCallback);

    fn detach(&self) -> Result<(), OtError>;
    fn erase_persistent_info(&self) -> Result<(), OtError>;
    fn reset(&self);
    fn joiner_stop(&self);
    fn permit_unsecure_join(&self, port: u16, timeout: u32) -> Result<(), OtError>;
    fn add_on_mesh_prefix(&self, prefix: OnMeshPrefix) -> Result<(), OtError>;
    fn remove_on_mesh_prefix(&self, prefix: Ip6Prefix) -> Result<(), OtError>;
    fn add_external_route(&self, route: ExternalRoute) -> Result<(), OtError>;
    fn remove_external_route(&self, prefix: Ip6Prefix) -> Result<(), OtError>;
    fn update_meshcop_txt(&self, entries: BTreeMap<String, Vec<u8>>) -> Result<(), OtError>;

    fn link_mode(&self) -> Result<LinkModeConfig, OtError>;
    fn set_link_mode(&self, mode: LinkModeConfig) -> Result<(), OtError>;
    fn device_role(&self) -> DeviceRole;
    fn network_name(&self) -> Result<String, OtError>;
    fn pan_id(&self) -> Result<u16, OtError>;
    fn ext_pan_id(&self) -> Result<u64, OtError>;
    fn eui64(&self) -> Result<u64, OtError>;
    fn channel(&self) -> Result<u16, OtError>;
    fn network_key(&self) -> Result<Vec<u8>, OtError>;
    fn cca_failure_rate(&self) -> Result<u16, OtError>;
    fn link_counters(&self) -> Result<MacCounters, OtError>;
    fn ip6_counters(&self) -> Result<IpCounters, OtError>;
    fn supported_channel_mask(&self) -> Result<u32, OtError>;
    fn rloc16(&self) -> Result<u16, OtError>;
    fn extended_address(&self) -> Result<u64, OtError>;
    fn router_id(&self) -> Result<u8, OtError>;
    fn leader_data(&self) -> Result<LeaderData, OtError>;
    fn network_data(&self) -> Result<Vec<u8>, OtError>;
    fn stable_network_data(&self) -> Result<Vec<u8>, OtError>;
    fn local_leader_weight(&self) -> Result<u8, OtError>;
    fn channel_monitor_sample_count(&self) -> Result<u32, OtError>;
    fn channel_monitor_all_channel_qualities(&self) -> Result<Vec<ChannelQuality>, OtError>;
    fn child_table(&self) -> Result<Vec<ChildInfo>, OtError>;
    fn neighbor_table(&self) -> Result<Vec<NeighborInfo>, OtError>;
    fn partition_id(&self) -> Result<u32, OtError>;
    fn instant_rssi(&self) -> Result<i8, OtError>;
    fn radio_tx_power(&self) -> Result<i8, OtError>;
    fn external_routes(&self) -> Result<Vec<ExternalRoute>, OtError>;
    fn on_mesh_prefixes(&self) -> Result<Vec<OnMeshPrefix>, OtError>;
    fn active_dataset_tlvs(&self) -> Result<Vec<u8>, OtError>;
    fn set_active_dataset_tlvs(&self, tlvs: Vec<u8>) -> Result<(), OtError>;
    /// The region code, first character in the high byte.
    fn radio_region(&self) -> Result<u16, OtError>;
    fn set_radio_region(&self, code: u16) -> Result<(), OtError>;
    fn set_mesh_local_prefix(&self, prefix: [u8; 8]) -> Result<(), OtError>;
    fn set_legacy_ula_prefix(&self, prefix: [u8; 8]) -> Result<(), OtError>;
    fn srp_server_info(&self) -> Result<SrpServerInfo, OtError>;
    fn mdns_telemetry_info(&self) -> Result<MdnsTelemetryInfo, OtError>;
    fn dnssd_counters(&self) -> Result<DnssdCounters, OtError>;
    fn ot_host_version(&self) -> Result<String, OtError>;
    fn ot_rcp_version(&self) -> Result<String, OtError>;
    fn thread_version(&self) -> Result<u16, OtError>;

    fn add_device_role_handler(&self, handler: Box<dyn Fn(DeviceRole)>);
    fn add_active_dataset_change_handler(&self, handler: Box<dyn Fn(&[u8])>);
    /// Called after the co-processor has been reset.
    fn add_reset_handler(&self, handler: Box<dyn Fn()>);
}
