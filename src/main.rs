fn main() {
    serial_bridge_lib::run()
}
