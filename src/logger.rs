const LOG_CONFIG_FILE: &str = "log4rs.yaml";

#[ctor::ctor]
fn init() {
    if let Err(e) = log4rs::init_file(LOG_CONFIG_FILE, Default::default()) {
        eprintln!(
            "Logging disabled, unable to load '{}': {}",
            LOG_CONFIG_FILE, e
        );
    }
}

pub fn log_section(name: &str, content: &[u8]) {
    fn get_byte_array(bytes: &[u8]) -> Vec<String> {
        bytes.iter().map(|byte| format!("{:02X}", byte)).collect()
    }
    log::info!("{} ({} bytes) {:?}", name, content.len(), get_byte_array(content));
}
