fn main() {
    aichat::config::load_dotenv();
    dioxus::launch(aichat::ui::App);
}
