use cfg_aliases::cfg_aliases;

fn main() {
    // Setup cfg aliases
    cfg_aliases! {
        std_io: { any(target_os = "windows", target_os = "linux", target_os = "macos") },
    }
}
