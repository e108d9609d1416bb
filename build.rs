fn main() {
    for var in [
        "PINSYNC_WIFI_SSID",
        "PINSYNC_WIFI_PASSWORD",
        "PINSYNC_AUTH_TOKEN",
        "PINSYNC_SERVER",
        "PINSYNC_CONFIG_JSON",
    ] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
