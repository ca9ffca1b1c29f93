//! Structs exchanged with Border Router clients.
//!
//! Field order is the wire order.

dbus_struct! {
    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    pub struct ActiveScanResult {
        pub ext_address: u64,
        pub network_name: String,
        pub ext_pan_id: u64,
        pub steering_data: Vec<u8>,
        pub pan_id: u16,
        pub joiner_udp_port: u16,
        pub channel: u8,
        pub rssi: i8,
        pub lqi: u8,
        pub version: u8,
        pub is_native: bool,
        pub is_joinable: bool,
    }
}

dbus_struct! {
    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    pub struct EnergyScanResult {
        pub channel: u8,
        pub max_rssi: i8,
    }
}

dbus_struct! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct LinkModeConfig {
        pub rx_on_when_idle: bool,
        pub device_type: bool,
        pub network_data: bool,
    }
}

dbus_struct! {
    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    pub struct Ip6Prefix {
        pub prefix: Vec<u8>,
        pub length: u8,
    }
}

dbus_struct! {
    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    pub struct OnMeshPrefix {
        pub prefix: Ip6Prefix,
        pub rloc16: u16,
        pub preference: i8,
        pub preferred: bool,
        pub slaac: bool,
        pub dhcp: bool,
        pub configure: bool,
        pub default_route: bool,
        pub on_mesh: bool,
        pub stable: bool,
        pub nd_dns: bool,
        pub dp: bool,
    }
}

dbus_struct! {
    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    pub struct ExternalRoute {
        pub prefix: Ip6Prefix,
        pub rloc16: u16,
        pub preference: i8,
        pub stable: bool,
        pub next_hop_is_this_device: bool,
    }
}

dbus_struct! {
    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    pub struct MacCounters {
        pub tx_total: u32,
        pub tx_unicast: u32,
        pub tx_broadcast: u32,
        pub tx_ack_requested: u32,
        pub tx_acked: u32,
        pub tx_no_ack_requested: u32,
        pub tx_data: u32,
        pub tx_data_poll: u32,
        pub tx_beacon: u32,
        pub tx_beacon_request: u32,
        pub tx_other: u32,
        pub tx_retry: u32,
        pub tx_err_cca: u32,
        pub tx_err_abort: u32,
        pub tx_err_busy_channel: u32,
        pub rx_total: u32,
        pub rx_unicast: u32,
        pub rx_broadcast: u32,
        pub rx_data: u32,
        pub rx_data_poll: u32,
        pub rx_beacon: u32,
        pub rx_beacon_request: u32,
        pub rx_other: u32,
        pub rx_address_filtered: u32,
        pub rx_dest_addr_filtered: u32,
        pub rx_duplicated: u32,
        pub rx_err_no_frame: u32,
        pub rx_err_unknown_neighbor: u32,
        pub rx_err_invalid_src_addr: u32,
        pub rx_err_sec: u32,
        pub rx_err_fcs: u32,
        pub rx_err_other: u32,
    }
}

dbus_struct! {
    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    pub struct IpCounters {
        pub tx_success: u32,
        pub rx_success: u32,
        pub tx_failure: u32,
        pub rx_failure: u32,
    }
}

dbus_struct! {
    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    pub struct ChildInfo {
        pub ext_address: u64,
        pub timeout: u32,
        pub age: u32,
        pub rloc16: u16,
        pub network_data_version: u8,
        pub link_quality_in: u8,
        pub average_rssi: i8,
        pub last_rssi: i8,
        pub frame_error_rate: u16,
        pub message_error_rate: u16,
        pub rx_on_when_idle: bool,
        pub full_thread_device: bool,
        pub full_network_data: bool,
        pub is_state_restoring: bool,
    }
}

dbus_struct! {
    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    pub struct NeighborInfo {
        pub ext_address: u64,
        pub age: u32,
        pub rloc16: u16,
        pub link_frame_counter: u32,
        pub mle_frame_counter: u32,
        pub link_quality_in: u8,
        pub average_rssi: i8,
        pub last_rssi: i8,
        pub frame_error_rate: u16,
        pub message_error_rate: u16,
        pub rx_on_when_idle: bool,
        pub full_thread_device: bool,
        pub full_network_data: bool,
        pub is_child: bool,
    }
}

dbus_struct! {
    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    pub struct LeaderData {
        pub partition_id: u32,
        pub weighting: u8,
        pub data_version: u8,
        pub stable_data_version: u8,
        pub leader_router_id: u8,
    }
}

dbus_struct! {
    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    pub struct ChannelQuality {
        pub channel: u8,
        pub occupancy: u16,
    }
}

dbus_struct! {
    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    pub struct TxtEntry {
        pub key: String,
        pub value: Vec<u8>,
    }
}

dbus_struct! {
    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    pub struct SrpServerRegistrationInfo {
        pub fresh_count: u32,
        pub deleted_count: u32,
        pub lease_time_total: u64,
        pub key_lease_time_total: u64,
        pub remaining_lease_time_total: u64,
        pub remaining_key_lease_time_total: u64,
    }
}

dbus_struct! {
    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    pub struct SrpServerResponseCounters {
        pub success: u32,
        pub server_failure: u32,
        pub format_error: u32,
        pub name_exists: u32,
        pub refused: u32,
        pub other: u32,
    }
}

dbus_struct! {
    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    pub struct SrpServerInfo {
        pub state: u8,
        pub port: u16,
        pub address_mode: u8,
        pub hosts: SrpServerRegistrationInfo,
        pub services: SrpServerRegistrationInfo,
        pub response_counters: SrpServerResponseCounters,
    }
}

dbus_struct! {
    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    pub struct DnssdCounters {
        pub success_response: u32,
        pub server_failure_response: u32,
        pub format_error_response: u32,
        pub name_error_response: u32,
        pub not_implemented_response: u32,
        pub other_response: u32,
        pub resolved_by_srp: u32,
    }
}

dbus_struct! {
    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    pub struct MdnsResponseCounters {
        pub success: u32,
        pub not_found: u32,
        pub invalid_args: u32,
        pub duplicated: u32,
        pub not_implemented: u32,
        pub unknown_error: u32,
    }
}

dbus_struct! {
    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    pub struct MdnsTelemetryInfo {
        pub host_registrations: MdnsResponseCounters,
        pub service_registrations: MdnsResponseCounters,
        pub host_resolutions: MdnsResponseCounters,
        pub service_resolutions: MdnsResponseCounters,
        pub host_registration_ema_latency: u32,
        pub service_registration_ema_latency: u32,
        pub host_resolution_ema_latency: u32,
        pub service_resolution_ema_latency: u32,
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum DeviceRole {
    #[default]
    Disabled,
    Detached,
    Child,
    Router,
    Leader,
}

impl DeviceRole {
    pub fn name(self) -> &'static str {
        match self {
            DeviceRole::Disabled => "disabled",
            DeviceRole::Detached => "detached",
            DeviceRole::Child => "child",
            DeviceRole::Router => "router",
            DeviceRole::Leader => "leader",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let role = match name {
            "disabled" => DeviceRole::Disabled,
            "detached" => DeviceRole::Detached,
            "child" => DeviceRole::Child,
            "router" => DeviceRole::Router,
            "leader" => DeviceRole::Leader,
            _ => return None,
        };
        Some(role)
    }
}
