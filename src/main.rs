fn main() {
    otbr_dbus::cli::main();
}
