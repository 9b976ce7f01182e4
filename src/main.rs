fn main() -> std::process::ExitCode {
    compileai_lib::run()
}
