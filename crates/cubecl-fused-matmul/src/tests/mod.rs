mod host_launcher;
mod test_utils;
