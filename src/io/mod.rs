// External I/O: everything that talks to the OS or the bus
pub mod dbus; // nl.whynothugo.darkman server and client
pub mod geoclue; // GeoClue2 location updates
pub mod lock; // Single-instance lock file
pub mod portal; // XDG desktop portal color-scheme backend
pub mod signals; // Unix signal handling and the shutdown token
pub mod system_events; // Resume and wall-clock change detection
