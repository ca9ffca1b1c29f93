//! Names of the Border Router interface on the bus.

pub const INTERFACE: &str = "io.openthread.BorderRouter";
pub const OBJECT_PATH_PREFIX: &str = "/io/openthread/BorderRouter/";
pub const BUS_NAME_PREFIX: &str = "io.openthread.BorderRouter.";

pub fn object_path(interface_name: &str) -> String {
    format!("{}{}", OBJECT_PATH_PREFIX, interface_name)
}

pub fn bus_name(interface_name: &str) -> String {
    format!("{}{}", BUS_NAME_PREFIX, interface_name)
}

pub const SIGNAL_READY: &str = "Ready";

pub const METHOD_SCAN: &str = "Scan";
pub const METHOD_ENERGY_SCAN: &str = "EnergyScan";
pub const METHOD_ATTACH: &str = "Attach";
pub const METHOD_DETACH: &str = "Detach";
pub const METHOD_FACTORY_RESET: &str = "FactoryReset";
pub const METHOD_RESET: &str = "Reset";
pub const METHOD_JOINER_START: &str = "JoinerStart";
pub const METHOD_JOINER_STOP: &str = "JoinerStop";
pub const METHOD_PERMIT_UNSECURE_JOIN: &str = "PermitUnsecureJoin";
pub const METHOD_ADD_ON_MESH_PREFIX: &str = "AddOnMeshPrefix";
pub const METHOD_REMOVE_ON_MESH_PREFIX: &str = "RemoveOnMeshPrefix";
pub const METHOD_ADD_EXTERNAL_ROUTE: &str = "AddExternalRoute";
pub const METHOD_REMOVE_EXTERNAL_ROUTE: &str = "RemoveExternalRoute";
pub const METHOD_ATTACH_ALL_NODES_TO: &str = "AttachAllNodesTo";
pub const METHOD_UPDATE_VENDOR_MESHCOP_TXT: &str = "UpdateVendorMeshCopTxtEntries";
pub const METHOD_GET_PROPERTIES: &str = "GetProperties";

pub const PROPERTY_MESH_LOCAL_PREFIX: &str = "MeshLocalPrefix";
pub const PROPERTY_LEGACY_ULA_PREFIX: &str = "LegacyULAPrefix";
pub const PROPERTY_LINK_MODE: &str = "LinkMode";
pub const PROPERTY_DEVICE_ROLE: &str = "DeviceRole";
pub const PROPERTY_NETWORK_NAME: &str = "NetworkName";
pub const PROPERTY_PANID: &str = "PanId";
pub const PROPERTY_EXTPANID: &str = "ExtPanId";
pub const PROPERTY_EUI64: &str = "Eui64";
pub const PROPERTY_CHANNEL: &str = "Channel";
pub const PROPERTY_NETWORK_KEY: &str = "NetworkKey";
pub const PROPERTY_CCA_FAILURE_RATE: &str = "CcaFailureRate";
pub const PROPERTY_LINK_COUNTERS: &str = "LinkCounters";
pub const PROPERTY_IP6_COUNTERS: &str = "Ip6Counters";
pub const PROPERTY_SUPPORTED_CHANNEL_MASK: &str = "SupportedChannelMask";
pub const PROPERTY_RLOC16: &str = "Rloc16";
pub const PROPERTY_EXTENDED_ADDRESS: &str = "ExtendedAddress";
pub const PROPERTY_ROUTER_ID: &str = "RouterID";
pub const PROPERTY_LEADER_DATA: &str = "LeaderData";
pub const PROPERTY_NETWORK_DATA: &str = "NetworkData";
pub const PROPERTY_STABLE_NETWORK_DATA: &str = "StableNetworkData";
pub const PROPERTY_LOCAL_LEADER_WEIGHT: &str = "LocalLeaderWeight";
pub const PROPERTY_CHANNEL_MONITOR_SAMPLE_COUNT: &str = "ChannelMonitorSampleCount";
pub const PROPERTY_CHANNEL_MONITOR_ALL_CHANNEL_QUALITIES: &str =
    "ChannelMonitorAllChannelQualities";
pub const PROPERTY_CHILD_TABLE: &str = "ChildTable";
pub const PROPERTY_NEIGHBOR_TABLE: &str = "NeighborTable";
pub const PROPERTY_PARTITION_ID: &str = "PartitionID";
pub const PROPERTY_INSTANT_RSSI: &str = "InstantRssi";
pub const PROPERTY_RADIO_TX_POWER: &str = "RadioTxPower";
pub const PROPERTY_EXTERNAL_ROUTES: &str = "ExternalRoutes";
pub const PROPERTY_ON_MESH_PREFIXES: &str = "OnMeshPrefixes";
pub const PROPERTY_ACTIVE_DATASET_TLVS: &str = "ActiveDatasetTlvs";
pub const PROPERTY_RADIO_REGION: &str = "RadioRegion";
pub const PROPERTY_SRP_SERVER_INFO: &str = "SrpServerInfo";
pub const PROPERTY_MDNS_TELEMETRY_INFO: &str = "MdnsTelemetryInfo";
pub const PROPERTY_DNSSD_COUNTERS: &str = "DnssdCounters";
pub const PROPERTY_OT_HOST_VERSION: &str = "OtHostVersion";
pub const PROPERTY_OT_RCP_VERSION: &str = "OtRcpVersion";
pub const PROPERTY_THREAD_VERSION: &str = "ThreadVersion";
