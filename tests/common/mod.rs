use assert_cmd::Command;

pub fn apodd_bin() -> Command {
    #[allow(deprecated)]
    {
        Command::cargo_bin("apodd").expect("apodd test binary should build")
    }
}
